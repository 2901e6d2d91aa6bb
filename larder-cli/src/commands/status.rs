//! Status command - show catalog and model state
//!
//! Never loads the model, so it works before any weights are downloaded.

use std::path::Path;

use colored::Colorize;
use larder_store::RecipeStats;
use serde::Serialize;

use super::{display_path, AppContext};
use crate::output::{Output, TableDisplay};

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub store_path: String,
    pub catalog_exists: bool,
    pub schema_version: Option<String>,
    pub total_recipes: usize,
    pub recipes_with_embeddings: usize,
    pub embedding_model: Option<String>,
    pub coverage_percent: f32,
    pub model_dir: String,
    pub model_available: bool,
    pub config_file: Option<String>,
    pub top_k: usize,
    pub min_similarity: f32,
    pub extractor_enabled: bool,
}

fn yes_no(flag: bool) -> colored::ColoredString {
    if flag {
        "yes".green()
    } else {
        "no".red()
    }
}

impl TableDisplay for StatusReport {
    fn to_table(&self) -> String {
        let mut output = format!("{}\n\n", "LARDER STATUS".cyan().bold());

        output.push_str(&format!("{}\n", "Catalog".bold()));
        output.push_str(&format!("  Path:        {}\n", self.store_path));
        output.push_str(&format!("  Exists:      {}\n", yes_no(self.catalog_exists)));
        if self.catalog_exists {
            output.push_str(&format!(
                "  Schema:      {}\n",
                self.schema_version.as_deref().unwrap_or("unknown")
            ));
            output.push_str(&format!("  Recipes:     {}\n", self.total_recipes));
            output.push_str(&format!(
                "  Embedded:    {} ({:.1}%)\n",
                self.recipes_with_embeddings, self.coverage_percent
            ));
            if let Some(model) = &self.embedding_model {
                output.push_str(&format!("  Model:       {}\n", model));
            }
        }

        output.push_str(&format!("\n{}\n", "Embedding model".bold()));
        output.push_str(&format!("  Directory:   {}\n", self.model_dir));
        output.push_str(&format!("  Available:   {}\n", yes_no(self.model_available)));

        output.push_str(&format!("\n{}\n", "Search".bold()));
        output.push_str(&format!("  Top K:       {}\n", self.top_k));
        output.push_str(&format!("  Min score:   {}\n", self.min_similarity));
        output.push_str(&format!(
            "  Extractor:   {}\n",
            yes_no(self.extractor_enabled)
        ));
        output.push_str(&format!(
            "  Config:      {}",
            self.config_file.as_deref().unwrap_or("(defaults)")
        ));

        if !self.catalog_exists {
            output.push_str(&format!(
                "\n\n{}",
                "Tip: Run 'larder ingest <file>' to build the catalog".dimmed()
            ));
        }
        output
    }
}

/// Run the status command
pub async fn run(ctx: &AppContext, config_file: &Path) -> anyhow::Result<()> {
    let catalog_exists = ctx.catalog_exists();
    let (schema_version, stats) = if catalog_exists {
        let store = ctx.open_store_read_only()?;
        (store.schema_version()?, store.stats()?)
    } else {
        (
            None,
            RecipeStats {
                total_recipes: 0,
                recipes_with_embeddings: 0,
                model: None,
                coverage_percent: 0.0,
            },
        )
    };

    let report = StatusReport {
        store_path: display_path(&ctx.store_path),
        catalog_exists,
        schema_version,
        total_recipes: stats.total_recipes,
        recipes_with_embeddings: stats.recipes_with_embeddings,
        embedding_model: stats.model,
        coverage_percent: stats.coverage_percent,
        model_dir: display_path(&ctx.model_dir),
        model_available: ctx.model_available(),
        config_file: config_file.exists().then(|| display_path(config_file)),
        top_k: ctx.config.search.top_k,
        min_similarity: ctx.config.search.min_similarity,
        extractor_enabled: ctx.config.extractor.enabled,
    };

    Output::new(report, ctx.format).render()
}
