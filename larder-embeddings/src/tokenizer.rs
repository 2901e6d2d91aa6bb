//! Tokenizer wrapper producing padded model inputs.

use crate::error::{EmbeddingError, Result};
use crate::DEFAULT_MAX_LENGTH;
use std::path::Path;
use tokenizers::{Tokenizer, TruncationParams};

/// HuggingFace tokenizer configured for sentence encoding.
pub struct SentenceTokenizer {
    tokenizer: Tokenizer,
    max_length: usize,
}

/// Encoded input ready for model inference.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedInput {
    /// Token IDs.
    pub input_ids: Vec<u32>,
    /// Attention mask (1 for real tokens, 0 for padding).
    pub attention_mask: Vec<u32>,
    /// Token type IDs (all 0 for single sequence).
    pub token_type_ids: Vec<u32>,
}

impl EncodedInput {
    fn len(&self) -> usize {
        self.input_ids.len()
    }

    fn pad_to(&mut self, len: usize) {
        if self.len() < len {
            self.input_ids.resize(len, 0);
            self.attention_mask.resize(len, 0);
            self.token_type_ids.resize(len, 0);
        }
    }
}

impl SentenceTokenizer {
    /// Load `tokenizer.json` from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(EmbeddingError::Tokenizer {
                message: format!("Tokenizer file not found: {}", path.display()),
            });
        }
        Self::configure(Tokenizer::from_file(path)?, DEFAULT_MAX_LENGTH)
    }

    /// Parse a tokenizer from its JSON definition.
    pub fn from_json(json: &str) -> Result<Self> {
        let tokenizer =
            Tokenizer::from_bytes(json.as_bytes()).map_err(|e| EmbeddingError::Tokenizer {
                message: format!("Failed to parse tokenizer JSON: {}", e),
            })?;
        Self::configure(tokenizer, DEFAULT_MAX_LENGTH)
    }

    /// Change the truncation length (default 256 tokens).
    pub fn with_max_length(self, max_length: usize) -> Result<Self> {
        Self::configure(self.tokenizer, max_length)
    }

    // Truncation is done by the tokenizer so the closing special token
    // survives; padding is done here, per batch.
    fn configure(mut tokenizer: Tokenizer, max_length: usize) -> Result<Self> {
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| EmbeddingError::Tokenizer {
                message: format!("Invalid truncation length {}: {}", max_length, e),
            })?;
        Ok(Self {
            tokenizer,
            max_length,
        })
    }

    /// Encode one text, truncated to `max_length`.
    pub fn encode(&self, text: &str) -> Result<EncodedInput> {
        let encoding =
            self.tokenizer
                .encode(text, true)
                .map_err(|e| EmbeddingError::Tokenizer {
                    message: format!("Encoding failed: {}", e),
                })?;

        Ok(EncodedInput {
            input_ids: encoding.get_ids().to_vec(),
            attention_mask: encoding.get_attention_mask().to_vec(),
            token_type_ids: encoding.get_type_ids().to_vec(),
        })
    }

    /// Encode texts and pad them to the longest one.
    pub fn encode_batch(&self, texts: &[&str]) -> Result<Vec<EncodedInput>> {
        let mut encodings = texts
            .iter()
            .map(|text| self.encode(text))
            .collect::<Result<Vec<_>>>()?;
        pad_batch(&mut encodings);
        Ok(encodings)
    }

    /// Get the vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }

    /// Get the maximum sequence length.
    pub fn max_length(&self) -> usize {
        self.max_length
    }
}

fn pad_batch(encodings: &mut [EncodedInput]) {
    let longest = encodings.iter().map(EncodedInput::len).max().unwrap_or(0);
    for encoding in encodings {
        encoding.pad_to(longest);
    }
}
