//! Embedding provider and the model trait it drives.
//!
//! [`EmbeddingModel`] is the seam to the sentence-embedding backend. It lives
//! here so that backends (like larder-embeddings) depend on the core and not
//! the other way round.

use tracing::debug;

use crate::error::{CoreError, Result};
use crate::ingredients::{normalize, IngredientInput, IngredientSet};
use crate::similarity;

/// Error type reported by embedding backends.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Model not loaded or initialized
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),

    /// Failed to generate embedding
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Input text too long
    #[error("input too long: {len} tokens, max {max}")]
    InputTooLong { len: usize, max: usize },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Result type for embedding backends.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Trait for models that turn text into fixed-length vectors.
///
/// # Example
///
/// ```
/// use larder_core::embedding::{EmbeddingModel, ModelResult};
///
/// struct Constant;
///
/// impl EmbeddingModel for Constant {
///     fn embed(&self, _text: &str) -> ModelResult<Vec<f32>> {
///         Ok(vec![0.5, 0.5, 0.5])
///     }
///
///     fn dimension(&self) -> usize {
///         3
///     }
///
///     fn model_name(&self) -> &str {
///         "constant"
///     }
/// }
/// ```
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text.
    fn embed(&self, text: &str) -> ModelResult<Vec<f32>>;

    /// Generate embeddings for multiple texts.
    ///
    /// Default implementation calls `embed` for each text.
    fn embed_batch(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Declared output dimensionality.
    fn dimension(&self) -> usize;

    /// Model name/identifier, recorded on every built document.
    fn model_name(&self) -> &str;

    /// Check if the model is ready to generate embeddings.
    fn is_ready(&self) -> bool {
        true
    }
}

/// Turns ingredient sets into embedding vectors through an [`EmbeddingModel`].
///
/// Dimension and model name are captured once at construction, so callers can
/// validate vector lengths without touching the model again.
pub struct EmbeddingProvider {
    model: Box<dyn EmbeddingModel>,
    model_name: String,
    dimension: usize,
}

impl EmbeddingProvider {
    /// Wrap a loaded model.
    ///
    /// # Errors
    ///
    /// [`CoreError::EmbeddingUnavailable`] if the model is not ready or declares
    /// a zero dimension.
    pub fn new(model: impl EmbeddingModel + 'static) -> Result<Self> {
        Self::from_boxed(Box::new(model))
    }

    pub fn from_boxed(model: Box<dyn EmbeddingModel>) -> Result<Self> {
        if !model.is_ready() {
            return Err(CoreError::EmbeddingUnavailable(format!(
                "model '{}' is not ready",
                model.model_name()
            )));
        }

        let dimension = model.dimension();
        if dimension == 0 {
            return Err(CoreError::EmbeddingUnavailable(format!(
                "model '{}' declares a zero output dimension",
                model.model_name()
            )));
        }

        let model_name = model.model_name().to_string();
        debug!(model = %model_name, dimension, "Embedding provider ready");

        Ok(Self {
            model,
            model_name,
            dimension,
        })
    }

    /// Output dimensionality cached at construction.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Embed a normalized ingredient set.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmbeddingUnavailable`] when the model fails.
    /// - [`CoreError::DimensionMismatch`] when the model returns a vector of the wrong length.
    pub fn embed(&self, ingredients: &IngredientSet) -> Result<Vec<f32>> {
        let text = ingredients.to_text();
        let vector = self
            .model
            .embed(&text)
            .map_err(|e| CoreError::EmbeddingUnavailable(e.to_string()))?;
        self.check_dimension(&vector)?;
        Ok(vector)
    }

    /// Normalize raw input and embed it.
    pub fn embed_input(&self, input: impl Into<IngredientInput>) -> Result<Vec<f32>> {
        let ingredients = normalize(input)?;
        self.embed(&ingredients)
    }

    /// Embed several ingredient sets in one model call.
    pub fn embed_many(&self, sets: &[IngredientSet]) -> Result<Vec<Vec<f32>>> {
        if sets.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<String> = sets.iter().map(IngredientSet::to_text).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self
            .model
            .embed_batch(&refs)
            .map_err(|e| CoreError::EmbeddingUnavailable(e.to_string()))?;

        if vectors.len() != sets.len() {
            return Err(CoreError::EmbeddingUnavailable(format!(
                "model returned {} vectors for {} inputs",
                vectors.len(),
                sets.len()
            )));
        }
        for vector in &vectors {
            self.check_dimension(vector)?;
        }
        Ok(vectors)
    }

    /// Cosine similarity between two vectors; see [`similarity::cosine_similarity`].
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        similarity::cosine_similarity(a, b)
    }

    /// Fail unless `vector` has the provider's dimension.
    pub fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(CoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for EmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingProvider")
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Deterministic bag-of-characters model used across the crate's tests.
    pub struct CharModel {
        pub dimension: usize,
        pub ready: bool,
    }

    impl CharModel {
        pub fn new(dimension: usize) -> Self {
            Self {
                dimension,
                ready: true,
            }
        }
    }

    impl EmbeddingModel for CharModel {
        fn embed(&self, text: &str) -> ModelResult<Vec<f32>> {
            if text.contains("__fail__") {
                return Err(ModelError::EmbeddingFailed("forced failure".to_string()));
            }
            let mut vector = vec![0.0f32; self.dimension];
            for (position, byte) in text.bytes().enumerate() {
                let slot = (byte as usize + position) % self.dimension;
                vector[slot] += 1.0 + (position % 7) as f32 * 0.1;
            }
            Ok(vector)
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "char-model"
        }

        fn is_ready(&self) -> bool {
            self.ready
        }
    }

    /// Reports one dimension but produces another.
    pub struct LyingModel;

    impl EmbeddingModel for LyingModel {
        fn embed(&self, _text: &str) -> ModelResult<Vec<f32>> {
            Ok(vec![1.0, 2.0])
        }

        fn dimension(&self) -> usize {
            4
        }

        fn model_name(&self) -> &str {
            "lying-model"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{CharModel, LyingModel};
    use super::*;

    #[test]
    fn test_caches_dimension_and_name() {
        let provider = EmbeddingProvider::new(CharModel::new(16)).unwrap();
        assert_eq!(provider.dimension(), 16);
        assert_eq!(provider.model_name(), "char-model");
    }

    #[test]
    fn test_rejects_unready_model() {
        let model = CharModel {
            dimension: 16,
            ready: false,
        };
        assert!(matches!(
            EmbeddingProvider::new(model),
            Err(CoreError::EmbeddingUnavailable(_))
        ));
        assert!(matches!(
            EmbeddingProvider::new(CharModel::new(0)),
            Err(CoreError::EmbeddingUnavailable(_))
        ));
    }

    #[test]
    fn test_embed_is_deterministic() {
        let provider = EmbeddingProvider::new(CharModel::new(32)).unwrap();
        let set = normalize("chicken, tomato, onion").unwrap();
        let first = provider.embed(&set).unwrap();
        let second = provider.embed(&set).unwrap();
        assert_eq!(first.len(), 32);
        assert_eq!(first, second);
    }

    #[test]
    fn test_embed_is_order_sensitive() {
        let provider = EmbeddingProvider::new(CharModel::new(32)).unwrap();
        let a = provider.embed_input("chicken, onion").unwrap();
        let b = provider.embed_input("onion, chicken").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_input_is_not_an_embedding_failure() {
        let provider = EmbeddingProvider::new(CharModel::new(8)).unwrap();
        assert!(matches!(
            provider.embed_input(" , "),
            Err(CoreError::EmptyIngredientSet)
        ));
        assert!(matches!(
            provider.embed_input("__fail__"),
            Err(CoreError::EmbeddingUnavailable(_))
        ));
    }

    #[test]
    fn test_wrong_model_output_length() {
        let provider = EmbeddingProvider::new(LyingModel).unwrap();
        assert!(matches!(
            provider.embed_input("salt"),
            Err(CoreError::DimensionMismatch {
                expected: 4,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_embed_many_matches_single() {
        let provider = EmbeddingProvider::new(CharModel::new(24)).unwrap();
        let sets = vec![
            normalize("rice, beans").unwrap(),
            normalize("flour, sugar, butter").unwrap(),
        ];
        let batch = provider.embed_many(&sets).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], provider.embed(&sets[0]).unwrap());
        assert_eq!(batch[1], provider.embed(&sets[1]).unwrap());
        assert!(provider.embed_many(&[]).unwrap().is_empty());
    }
}
