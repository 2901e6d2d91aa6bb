//! BERT sentence encoder (all-MiniLM-L6-v2 family).

use crate::error::{EmbeddingError, Result};
use crate::tokenizer::{EncodedInput, SentenceTokenizer};
use crate::{DEFAULT_EMBEDDING_DIM, MODEL_NAME};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{
    BertModel, Config as BertConfig, HiddenAct, PositionEmbeddingType,
};
use larder_core::{EmbeddingModel, ModelResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Subset of a HuggingFace BERT `config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Hidden size (embedding dimension).
    pub hidden_size: usize,
    /// Number of attention heads.
    pub num_attention_heads: usize,
    /// Number of hidden layers.
    pub num_hidden_layers: usize,
    /// Intermediate size in feed-forward layers.
    pub intermediate_size: usize,
    /// Vocabulary size.
    pub vocab_size: usize,
    /// Maximum position embeddings.
    pub max_position_embeddings: usize,
    /// Hidden activation function.
    #[serde(default = "default_hidden_act")]
    pub hidden_act: String,
    /// Hidden dropout probability.
    #[serde(default = "default_dropout")]
    pub hidden_dropout_prob: f64,
    /// Type vocabulary size.
    #[serde(default = "default_type_vocab_size")]
    pub type_vocab_size: usize,
    /// Layer norm epsilon.
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    /// Weight prefix used by some checkpoints (`bert.embeddings...`).
    #[serde(default)]
    pub model_type: Option<String>,
}

fn default_hidden_act() -> String {
    "gelu".to_string()
}

fn default_dropout() -> f64 {
    0.1
}

fn default_type_vocab_size() -> usize {
    2
}

fn default_layer_norm_eps() -> f64 {
    1e-12
}

impl Default for ModelConfig {
    /// all-MiniLM-L6-v2.
    fn default() -> Self {
        Self {
            hidden_size: DEFAULT_EMBEDDING_DIM,
            num_attention_heads: 12,
            num_hidden_layers: 6,
            intermediate_size: 1536,
            vocab_size: 30522,
            max_position_embeddings: 512,
            hidden_act: default_hidden_act(),
            hidden_dropout_prob: default_dropout(),
            type_vocab_size: default_type_vocab_size(),
            layer_norm_eps: default_layer_norm_eps(),
            model_type: Some("bert".to_string()),
        }
    }
}

impl ModelConfig {
    /// Load configuration from a `config.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    fn activation(&self) -> Result<HiddenAct> {
        match self.hidden_act.as_str() {
            "gelu" => Ok(HiddenAct::Gelu),
            "gelu_approximate" | "gelu_new" => Ok(HiddenAct::GeluApproximate),
            "relu" => Ok(HiddenAct::Relu),
            other => Err(EmbeddingError::Config {
                message: format!("Unsupported hidden_act '{}'", other),
            }),
        }
    }

    fn to_bert_config(&self) -> Result<BertConfig> {
        Ok(BertConfig {
            vocab_size: self.vocab_size,
            hidden_size: self.hidden_size,
            num_hidden_layers: self.num_hidden_layers,
            num_attention_heads: self.num_attention_heads,
            intermediate_size: self.intermediate_size,
            hidden_act: self.activation()?,
            hidden_dropout_prob: self.hidden_dropout_prob,
            max_position_embeddings: self.max_position_embeddings,
            type_vocab_size: self.type_vocab_size,
            initializer_range: 0.02,
            layer_norm_eps: self.layer_norm_eps,
            pad_token_id: 0,
            position_embedding_type: PositionEmbeddingType::Absolute,
            use_cache: false,
            classifier_dropout: None,
            model_type: self.model_type.clone(),
        })
    }
}

/// How token embeddings are reduced to one sentence vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PoolingStrategy {
    /// Mask-aware mean over tokens. What sentence-transformers uses.
    #[default]
    Mean,
    /// The [CLS] token embedding.
    Cls,
    /// Mask-aware max over tokens.
    Max,
}

/// Sentence encoder backing Larder's ingredient embeddings.
pub struct SentenceEncoder {
    model: BertModel,
    tokenizer: SentenceTokenizer,
    config: ModelConfig,
    device: Device,
    pooling: PoolingStrategy,
    normalize: bool,
    name: String,
}

impl SentenceEncoder {
    /// Load from a directory holding `config.json`, `tokenizer.json` and
    /// `model.safetensors`.
    pub fn load<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        info!("Loading sentence encoder from: {}", model_dir.display());

        if !model_dir.is_dir() {
            return Err(EmbeddingError::ModelNotFound {
                path: model_dir.display().to_string(),
            });
        }

        let config_path = model_dir.join("config.json");
        let config = ModelConfig::from_file(&config_path).map_err(|e| EmbeddingError::Config {
            message: format!("Failed to load {}: {}", config_path.display(), e),
        })?;

        let tokenizer = SentenceTokenizer::from_file(model_dir.join("tokenizer.json"))?;

        let weights_path = model_dir.join("model.safetensors");
        if !weights_path.exists() {
            return Err(EmbeddingError::WeightLoad {
                message: format!("No model.safetensors in {}", model_dir.display()),
            });
        }
        let weights = std::fs::read(&weights_path)?;

        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| MODEL_NAME.to_string());

        Self::assemble(config, tokenizer, &weights, name)
    }

    /// Build from in-memory model files.
    pub fn from_bytes(config_json: &str, tokenizer_json: &str, weights: &[u8]) -> Result<Self> {
        info!("Loading sentence encoder from memory");
        let config: ModelConfig = serde_json::from_str(config_json)?;
        let tokenizer = SentenceTokenizer::from_json(tokenizer_json)?;
        Self::assemble(config, tokenizer, weights, MODEL_NAME.to_string())
    }

    fn assemble(
        config: ModelConfig,
        tokenizer: SentenceTokenizer,
        weights: &[u8],
        name: String,
    ) -> Result<Self> {
        debug!(
            hidden_size = config.hidden_size,
            vocab_size = tokenizer.vocab_size(),
            "Model files parsed"
        );

        let device = select_device();
        info!("Using device: {:?}", device);

        let tensors = candle_core::safetensors::load_buffer(weights, &device).map_err(|e| {
            EmbeddingError::WeightLoad {
                message: format!("Failed to read safetensors: {}", e),
            }
        })?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, &device);
        let model = BertModel::load(vb, &config.to_bert_config()?).map_err(|e| {
            EmbeddingError::WeightLoad {
                message: format!("Failed to load BERT model: {}", e),
            }
        })?;

        info!(model = %name, dimension = config.hidden_size, "Sentence encoder loaded");

        Ok(Self {
            model,
            tokenizer,
            config,
            device,
            pooling: PoolingStrategy::default(),
            normalize: true,
            name,
        })
    }

    /// Set the pooling strategy.
    pub fn with_pooling(mut self, strategy: PoolingStrategy) -> Self {
        self.pooling = strategy;
        self
    }

    /// Toggle L2 normalization of the output vectors (on by default).
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Override the name recorded on built documents.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Change the token truncation length.
    pub fn with_max_length(mut self, max_length: usize) -> Result<Self> {
        let max_length = max_length.min(self.config.max_position_embeddings);
        self.tokenizer = self.tokenizer.with_max_length(max_length)?;
        Ok(self)
    }

    /// Embed a batch of texts, one vector per text.
    pub fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} texts", texts.len());

        let encodings = self.tokenizer.encode_batch(texts)?;
        let (input_ids, attention_mask, token_type_ids) = self.to_tensors(&encodings)?;

        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(|e| EmbeddingError::Inference {
                message: format!("Forward pass failed: {}", e),
            })?;

        let pooled = self.pool(&hidden, &attention_mask)?;
        let mut vectors: Vec<Vec<f32>> = pooled.to_vec2()?;
        if self.normalize {
            vectors.iter_mut().for_each(|v| l2_normalize(v));
        }
        Ok(vectors)
    }

    /// Output dimensionality.
    pub fn embedding_dim(&self) -> usize {
        self.config.hidden_size
    }

    /// Parsed model configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Device inference runs on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    fn to_tensors(&self, encodings: &[EncodedInput]) -> Result<(Tensor, Tensor, Tensor)> {
        let batch_size = encodings.len();
        let seq_len = encodings.first().map_or(0, |e| e.input_ids.len());

        let shape = (batch_size, seq_len);
        let input_ids = Tensor::from_vec(
            flatten(encodings, |e| e.input_ids.as_slice()),
            shape,
            &self.device,
        )?;
        let attention_mask = Tensor::from_vec(
            flatten(encodings, |e| e.attention_mask.as_slice()),
            shape,
            &self.device,
        )?;
        let token_type_ids = Tensor::from_vec(
            flatten(encodings, |e| e.token_type_ids.as_slice()),
            shape,
            &self.device,
        )?;

        Ok((input_ids, attention_mask, token_type_ids))
    }

    fn pool(&self, hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let pooled = match self.pooling {
            PoolingStrategy::Cls => hidden.narrow(1, 0, 1)?.squeeze(1)?,
            PoolingStrategy::Mean => {
                let mask = attention_mask.unsqueeze(2)?.to_dtype(DType::F32)?;
                let sum = hidden.broadcast_mul(&mask)?.sum(1)?;
                let count = mask.sum(1)?;
                sum.broadcast_div(&count)?
            }
            PoolingStrategy::Max => {
                // Push padded positions far below any real activation.
                let mask = attention_mask.unsqueeze(2)?.to_dtype(DType::F32)?;
                let penalty = mask.affine(1e9, -1e9)?;
                hidden.broadcast_add(&penalty)?.max(1)?
            }
        };
        Ok(pooled)
    }
}

fn flatten(encodings: &[EncodedInput], field: impl Fn(&EncodedInput) -> &[u32]) -> Vec<i64> {
    encodings
        .iter()
        .flat_map(|e| field(e).iter().map(|&x| i64::from(x)))
        .collect()
}

/// Scale `vector` to unit length. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt();
    if norm > f64::EPSILON {
        for x in vector.iter_mut() {
            *x = (f64::from(*x) / norm) as f32;
        }
    }
}

fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

impl EmbeddingModel for SentenceEncoder {
    fn embed(&self, text: &str) -> ModelResult<Vec<f32>> {
        self.encode(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EmbeddingError::Inference {
                    message: "model returned no vector".to_string(),
                }
                .into()
            })
    }

    fn embed_batch(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        Ok(self.encode(texts)?)
    }

    fn dimension(&self) -> usize {
        self.embedding_dim()
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}
