//! Error types for larder-embeddings.

use larder_core::ModelError;
use thiserror::Error;

/// Result type alias for larder-embeddings operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;

/// Errors raised while loading or running the sentence encoder.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Model directory does not exist.
    #[error("Model directory not found: {path}")]
    ModelNotFound {
        /// Path that was searched.
        path: String,
    },

    /// Tokenizer file missing or unusable.
    #[error("Tokenizer error: {message}")]
    Tokenizer {
        /// What went wrong.
        message: String,
    },

    /// Weights could not be read or did not match the architecture.
    #[error("Failed to load model weights: {message}")]
    WeightLoad {
        /// What went wrong.
        message: String,
    },

    /// `config.json` missing or invalid.
    #[error("Invalid model configuration: {message}")]
    Config {
        /// What went wrong.
        message: String,
    },

    /// Forward pass failed.
    #[error("Inference error: {message}")]
    Inference {
        /// What went wrong.
        message: String,
    },

    /// Tensor plumbing failed.
    #[error("Tensor error: {message}")]
    Tensor {
        /// What went wrong.
        message: String,
    },

    /// IO error reading model files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error for config files.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::Tensor {
            message: err.to_string(),
        }
    }
}

impl From<tokenizers::Error> for EmbeddingError {
    fn from(err: tokenizers::Error) -> Self {
        EmbeddingError::Tokenizer {
            message: err.to_string(),
        }
    }
}

impl From<EmbeddingError> for ModelError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::ModelNotFound { .. }
            | EmbeddingError::WeightLoad { .. }
            | EmbeddingError::Config { .. } => ModelError::ModelNotLoaded(err.to_string()),
            EmbeddingError::Inference { .. }
            | EmbeddingError::Tensor { .. }
            | EmbeddingError::Tokenizer { .. } => ModelError::EmbeddingFailed(err.to_string()),
            other => ModelError::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EmbeddingError::ModelNotFound {
            path: "/models/minilm".to_string(),
        };
        assert!(err.to_string().contains("/models/minilm"));
    }

    #[test]
    fn test_model_error_mapping() {
        let err: ModelError = EmbeddingError::Config {
            message: "bad hidden_size".to_string(),
        }
        .into();
        assert!(matches!(err, ModelError::ModelNotLoaded(_)));

        let err: ModelError = EmbeddingError::Inference {
            message: "forward".to_string(),
        }
        .into();
        assert!(matches!(err, ModelError::EmbeddingFailed(_)));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ModelError = EmbeddingError::from(io).into();
        assert!(matches!(err, ModelError::Other(_)));
    }
}
