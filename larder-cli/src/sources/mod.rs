//! Recipe sources read by `larder ingest`.
//!
//! Each source turns a file into [`PendingRecipe`]s: everything needed to
//! build a document except the embedding.

use std::path::Path;

use clap::ValueEnum;
use larder_core::IngredientInput;
use serde_json::{Map, Value};

use crate::extractor::IngredientExtractor;

pub mod scraped;
pub mod tabular;

/// Input file layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceFormat {
    /// JSON array of scraped recipes (title, ingredients, times, image)
    Scraped,
    /// CSV export with RecipeId, Name, RecipeIngredientParts, ... columns
    Csv,
}

impl SourceFormat {
    /// Guess from the file extension: `.csv` is tabular, anything else scraped.
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SourceFormat::Csv,
            _ => SourceFormat::Scraped,
        }
    }
}

/// A recipe read from a source, ready for the document builder.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecipe {
    pub recipe_id: String,
    pub name: String,
    pub ingredients: IngredientInput,
    /// Extra document fields (times, images, category, ...).
    pub fields: Map<String, Value>,
}

/// Summary of one source read.
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub recipes: Vec<PendingRecipe>,
    /// Entries read from the file, including skipped ones.
    pub seen: usize,
    pub skipped: usize,
}

/// Read `path` in the given format.
///
/// `first_scraped_number` numbers scraped recipes, which carry no id of their
/// own; tabular rows keep their `RecipeId`.
pub async fn load(
    path: &Path,
    format: SourceFormat,
    extractor: Option<&IngredientExtractor>,
    limit: Option<usize>,
    first_scraped_number: usize,
) -> anyhow::Result<SourceBatch> {
    match format {
        SourceFormat::Scraped => {
            scraped::load(path, extractor, limit, first_scraped_number).await
        }
        SourceFormat::Csv => tabular::load(path, extractor, limit).await,
    }
}
