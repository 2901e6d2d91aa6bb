//! Shared constants for the Larder CLI.

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = ".larder.toml";

/// Catalog location when neither config nor flags name one.
pub const DEFAULT_STORE_PATH: &str = ".larder/recipes.duckdb";

/// Model directory when neither config nor flags name one.
pub const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

/// Ollama server used for ingredient extraction.
pub const DEFAULT_EXTRACTOR_ENDPOINT: &str = "http://localhost:11434";

/// Ollama model used for ingredient extraction.
pub const DEFAULT_EXTRACTOR_MODEL: &str = "llama3.2:3b";

/// Ingredients shown per search hit in table output.
pub const INGREDIENT_PREVIEW: usize = 10;

/// Spinner tick interval in milliseconds.
pub const SPINNER_TICK_MS: u64 = 100;
