//! Larder Embeddings - native sentence-embedding inference.
//!
//! Runs a BERT sentence encoder (all-MiniLM-L6-v2 by default) with Candle and
//! exposes it to the rest of Larder through [`larder_core::EmbeddingModel`].
//!
//! # Features
//!
//! - **Native inference**: no Python runtime, weights read from safetensors
//! - **CPU and GPU support**: CPU by default, optional CUDA/Metal acceleration
//! - **Batch processing**: one forward pass per batch, padded per batch
//!
//! # Usage
//!
//! ```rust,no_run
//! use larder_core::EmbeddingProvider;
//! use larder_embeddings::SentenceEncoder;
//!
//! let encoder = SentenceEncoder::load("models/all-MiniLM-L6-v2")?;
//! let provider = EmbeddingProvider::new(encoder)?;
//!
//! let vector = provider.embed_input("chicken, tomato, onion")?;
//! assert_eq!(vector.len(), 384);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod model;
mod tokenizer;

pub use error::{EmbeddingError, Result};
pub use model::{l2_normalize, ModelConfig, PoolingStrategy, SentenceEncoder};
pub use tokenizer::{EncodedInput, SentenceTokenizer};

/// Output dimension of all-MiniLM-L6-v2.
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Token truncation length used unless configured otherwise.
pub const DEFAULT_MAX_LENGTH: usize = 256;

/// Name recorded on documents when the model directory gives none.
pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";
