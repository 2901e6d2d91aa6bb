//! Error types for larder-core.

use thiserror::Error;

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by normalization, embedding, ranking and document building.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Normalization produced no usable ingredient.
    #[error("Empty ingredient set: no usable ingredients in input")]
    EmptyIngredientSet,

    /// Input looked like a list literal but could not be parsed as one.
    #[error("Malformed ingredient list: {0}")]
    MalformedIngredientList(String),

    /// The embedding model is missing, not ready, or failed on the input.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Two vectors that must be compared have different lengths.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Length required by the reference vector or model.
        expected: usize,
        /// Length actually seen.
        actual: usize,
    },

    /// A built or merged record does not have the recipe document shape.
    #[error("Invalid recipe document: {0}")]
    InvalidDocument(String),

    /// An operation ran before its dependency was initialized.
    #[error("Not initialized: {0}")]
    NotInitialized(&'static str),

    /// Storage collaborator failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Caller supplied input that can never be processed as given.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            CoreError::EmptyIngredientSet | CoreError::MalformedIngredientList(_)
        )
    }

    /// A later attempt might succeed (dependency outage rather than bad data).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CoreError::EmbeddingUnavailable(_) | CoreError::Store(StoreError::Backend(_))
        )
    }
}

/// Errors reported by [`RecipeStore`](crate::store::RecipeStore) implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No document stored under the key.
    #[error("Recipe not found: {0}")]
    NotFound(String),

    /// The underlying database failed.
    #[error("Store backend error: {0}")]
    Backend(String),

    /// A stored document could not be encoded or decoded.
    #[error("Store serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
