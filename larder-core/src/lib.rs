//! Larder Core - ingredient-to-recipe similarity retrieval.
//!
//! This crate provides:
//! - Ingredient normalization ([`ingredients`])
//! - The embedding provider and the [`EmbeddingModel`] backend trait ([`embedding`])
//! - Cosine similarity and top-K ranking ([`similarity`])
//! - Recipe document building ([`document`])
//! - The storage contract and an in-memory store ([`store`])
//! - A recommendation service with explicit initialization ([`recommender`])
//!
//! # Usage
//!
//! ```
//! use larder_core::{rank, normalize};
//!
//! let query = vec![1.0, 0.0];
//! let catalog = vec![("stew", vec![0.9, 0.1]), ("cake", vec![0.0, 1.0])];
//! let results = rank(
//!     &query,
//!     catalog.iter().map(|(name, v)| (*name, Some(v.as_slice()))),
//!     5,
//!     0.5,
//! );
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].document, "stew");
//!
//! let set = normalize("Chicken, Tomato, Onion")?;
//! assert_eq!(set.to_text(), "chicken, tomato, onion");
//! # Ok::<(), larder_core::CoreError>(())
//! ```

#![warn(clippy::all)]

pub mod document;
pub mod embedding;
mod error;
pub mod ingredients;
pub mod recommender;
pub mod similarity;
pub mod store;

pub use document::{DocumentBuilder, RecipeDocument};
pub use embedding::{EmbeddingModel, EmbeddingProvider, ModelError, ModelResult};
pub use error::{CoreError, Result, StoreError};
pub use ingredients::{normalize, IngredientInput, IngredientSet};
pub use recommender::{IngestOutcome, Recommendations, Recommender, RecommenderSettings};
pub use similarity::{cosine_similarity, rank, rank_documents, SimilarityResult};
pub use store::{MemoryStore, RecipeStore, StoreResult};
