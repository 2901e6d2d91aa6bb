//! Command implementations for the Larder CLI.
//!
//! Each command module provides a `run` function that executes the command logic.

pub mod delete;
pub mod get;
pub mod ingest;
pub mod search;
pub mod status;
pub mod validate;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use larder_core::EmbeddingProvider;
use larder_embeddings::SentenceEncoder;
use larder_store::{AccessMode, RecipeBase};

use crate::config::LarderConfig;
use crate::constants::SPINNER_TICK_MS;
use crate::output::OutputFormat;

/// Settings resolved from config file and global flags.
pub struct AppContext {
    pub config: LarderConfig,
    pub format: OutputFormat,
    pub model_dir: PathBuf,
    pub store_path: PathBuf,
    pub quiet: bool,
}

impl AppContext {
    pub fn new(
        config: LarderConfig,
        format: OutputFormat,
        model_dir: Option<PathBuf>,
        store_path: Option<PathBuf>,
        quiet: bool,
    ) -> Self {
        let model_dir = model_dir.unwrap_or_else(|| PathBuf::from(&config.model.dir));
        let store_path = store_path.unwrap_or_else(|| PathBuf::from(&config.store.path));
        Self {
            config,
            format,
            model_dir,
            store_path,
            quiet,
        }
    }

    /// Whether the model directory looks loadable.
    pub fn model_available(&self) -> bool {
        self.model_dir.join("config.json").exists()
    }

    /// Load the sentence encoder and wrap it in a provider.
    pub fn load_provider(&self) -> anyhow::Result<EmbeddingProvider> {
        let settings = &self.config.model;
        let mut encoder = SentenceEncoder::load(&self.model_dir)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}. Download all-MiniLM-L6-v2 \
                     there or pass --model-dir",
                    self.model_dir.display()
                )
            })?
            .with_normalize(settings.normalize)
            .with_max_length(settings.max_length)?;
        if let Some(name) = &settings.name {
            encoder = encoder.with_name(name.as_str());
        }
        Ok(EmbeddingProvider::new(encoder)?)
    }

    /// Open the catalog for reading. Fails if it has not been created yet.
    pub fn open_store_read_only(&self) -> anyhow::Result<RecipeBase> {
        self.ensure_catalog()?;
        RecipeBase::open_with_mode(&self.store_path, AccessMode::ReadOnly)
    }

    /// Open the catalog for writing, creating it if needed.
    pub fn open_store(&self) -> anyhow::Result<RecipeBase> {
        RecipeBase::open(&self.store_path)
    }

    /// Open an existing catalog for writing.
    pub fn open_store_read_write_existing(&self) -> anyhow::Result<RecipeBase> {
        self.ensure_catalog()?;
        self.open_store()
    }

    pub fn catalog_exists(&self) -> bool {
        self.store_path.exists()
    }

    fn ensure_catalog(&self) -> anyhow::Result<()> {
        if !self.catalog_exists() {
            anyhow::bail!(
                "No catalog found at {}. Run 'larder ingest <file>' first.",
                self.store_path.display()
            );
        }
        Ok(())
    }

    /// Spinner on stderr, hidden in quiet and JSON modes.
    pub fn spinner(&self) -> ProgressBar {
        if self.quiet || self.format == OutputFormat::Json {
            return ProgressBar::hidden();
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
        spinner
    }
}

/// Display form of a path for reports.
pub fn display_path(path: &Path) -> String {
    path.display().to_string()
}
