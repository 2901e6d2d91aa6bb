//! Larder configuration loading from `.larder.toml`.
//!
//! The file is optional; every setting has a default and command-line flags
//! override whatever the file says.
//!
//! # Example Configuration
//!
//! ```toml
//! [model]
//! dir = "models/all-MiniLM-L6-v2"
//! normalize = true
//! max_length = 256
//!
//! [search]
//! top_k = 5
//! min_similarity = 0.1
//!
//! [store]
//! path = ".larder/recipes.duckdb"
//!
//! [extractor]
//! enabled = false
//! endpoint = "http://localhost:11434"
//! model = "llama3.2:3b"
//! timeout_secs = 60
//!
//! [output]
//! format = "table"
//! color = true
//! ```

use serde::Deserialize;
use std::path::Path;

use crate::constants::{
    CONFIG_FILE, DEFAULT_EXTRACTOR_ENDPOINT, DEFAULT_EXTRACTOR_MODEL, DEFAULT_MODEL_DIR,
    DEFAULT_STORE_PATH,
};
use larder_core::recommender::{DEFAULT_MIN_SIMILARITY, DEFAULT_TOP_K};
use larder_embeddings::DEFAULT_MAX_LENGTH;

/// Root configuration loaded from `.larder.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct LarderConfig {
    #[serde(default)]
    pub model: ModelSettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub extractor: ExtractorSettings,

    #[serde(default)]
    pub output: OutputSettings,
}

/// Sentence-embedding model settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Directory with `config.json`, `tokenizer.json`, `model.safetensors`.
    pub dir: String,

    /// Name recorded on documents. Defaults to the directory name.
    pub name: Option<String>,

    /// L2-normalize embeddings.
    pub normalize: bool,

    /// Token truncation length.
    pub max_length: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            dir: DEFAULT_MODEL_DIR.to_string(),
            name: None,
            normalize: true,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }
}

/// Query defaults used when `search` is not given `-n` / `-t`.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub top_k: usize,
    pub min_similarity: f32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// DuckDB catalog file.
    pub path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: DEFAULT_STORE_PATH.to_string(),
        }
    }
}

/// LLM ingredient extraction used during ingestion.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_EXTRACTOR_ENDPOINT.to_string(),
            model: DEFAULT_EXTRACTOR_MODEL.to_string(),
            timeout_secs: 60,
        }
    }
}

/// Output formatting preferences.
///
/// `--format` on the command line wins over `format` here.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// `table` or `json`.
    #[serde(default)]
    pub format: Option<String>,

    /// Force colors on or off. Unset means auto-detect.
    #[serde(default)]
    pub color: Option<bool>,
}

impl LarderConfig {
    /// Load `.larder.toml` from `root`, or defaults if there is none.
    pub fn load(root: &Path) -> Self {
        Self::load_file(&root.join(CONFIG_FILE))
    }

    /// Load a specific config file. Read and parse errors are logged and
    /// fall back to defaults.
    pub fn load_file(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
            }
        }
        Self::default()
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Configured color override, or `None` for auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = LarderConfig::default();
        assert_eq!(config.search.top_k, 5);
        assert_eq!(config.search.min_similarity, 0.1);
        assert_eq!(config.store.path, ".larder/recipes.duckdb");
        assert_eq!(config.model.max_length, 256);
        assert!(config.model.normalize);
        assert!(!config.extractor.enabled);
        assert_eq!(config.extractor.model, "llama3.2:3b");
        assert!(config.output.format.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
[search]
top_k = 3

[extractor]
enabled = true
endpoint = "http://ollama:11434"

[output]
format = "json"
"#;
        let config: LarderConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.search.top_k, 3);
        assert_eq!(config.search.min_similarity, 0.1);
        assert!(config.extractor.enabled);
        assert_eq!(config.extractor.endpoint, "http://ollama:11434");
        assert_eq!(config.extractor.timeout_secs, 60);
        assert_eq!(config.default_format(), Some("json"));
        assert_eq!(config.model.dir, "models/all-MiniLM-L6-v2");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let config = LarderConfig::load(dir.path());
        assert_eq!(config.search.top_k, 5);
    }

    #[test]
    fn test_load_invalid_file_uses_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(".larder.toml"), "this is [not valid toml").unwrap();
        let config = LarderConfig::load(dir.path());
        assert_eq!(config.store.path, ".larder/recipes.duckdb");
    }

    #[test]
    fn test_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[store]\npath = \"catalog.duckdb\"\n").unwrap();
        let config = LarderConfig::load_file(&path);
        assert_eq!(config.store.path, "catalog.duckdb");
    }
}
