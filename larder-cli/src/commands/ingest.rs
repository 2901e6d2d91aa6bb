//! Ingest command - build recipe documents from a source file and store them

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use colored::Colorize;
use larder_core::{DocumentBuilder, RecipeDocument, RecipeStore};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::{display_path, AppContext};
use crate::extractor::IngredientExtractor;
use crate::output::{Output, TableDisplay};
use crate::sources::{self, scraped, SourceFormat};

/// Invalid documents listed in the error before truncating.
const MAX_REPORTED_PROBLEMS: usize = 5;

/// Outcome of one ingest run.
#[derive(Debug, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub format: String,
    /// Entries read from the source.
    pub seen: usize,
    /// Entries dropped by the source reader or the document builder.
    pub rejected: usize,
    pub built: usize,
    pub inserted: usize,
    /// Built documents whose key already existed.
    pub duplicates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump: Option<String>,
    pub duration_ms: u64,
}

impl TableDisplay for IngestReport {
    fn to_table(&self) -> String {
        let mut output = format!(
            "{} {} ({})\n\n",
            "INGEST:".cyan().bold(),
            self.source,
            self.format
        );
        output.push_str(&format!("  Read:        {}\n", self.seen));
        output.push_str(&format!("  Rejected:    {}\n", self.rejected));
        output.push_str(&format!("  Built:       {}\n", self.built));
        output.push_str(&format!(
            "  Inserted:    {}\n",
            self.inserted.to_string().green()
        ));
        output.push_str(&format!("  Duplicates:  {}\n", self.duplicates));
        if let Some(dump) = &self.dump {
            output.push_str(&format!("  Dumped to:   {}\n", dump));
        }
        output.push_str(&format!("\n{}", format!("Completed in {}ms", self.duration_ms).dimmed()));
        output
    }
}

fn format_name(format: SourceFormat) -> &'static str {
    match format {
        SourceFormat::Scraped => "scraped",
        SourceFormat::Csv => "csv",
    }
}

/// Problems across a batch, as `key: problem; problem` lines.
fn batch_problems(documents: &[RecipeDocument], expected_dim: usize) -> Vec<String> {
    documents
        .iter()
        .filter_map(|doc| {
            let problems = doc.problems(Some(expected_dim));
            if problems.is_empty() {
                None
            } else {
                Some(format!("{}: {}", doc.storage_key(), problems.join("; ")))
            }
        })
        .collect()
}

fn write_dump(path: &Path, documents: &[RecipeDocument]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(documents)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Recipe ids already in the catalog, empty when there is no catalog yet.
///
/// The read-only handle is dropped before the catalog is reopened for writing.
fn stored_recipe_ids(ctx: &AppContext) -> anyhow::Result<Vec<String>> {
    if !ctx.catalog_exists() {
        return Ok(Vec::new());
    }
    let store = ctx.open_store_read_only()?;
    Ok(store
        .get_all()?
        .into_iter()
        .map(|doc| doc.recipe_id)
        .collect())
}

/// Run the ingest command
pub async fn run(
    ctx: &AppContext,
    file: &Path,
    format: Option<SourceFormat>,
    limit: Option<usize>,
    dump: Option<PathBuf>,
    no_validate: bool,
) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("Source file not found: {}", file.display());
    }
    let start = Instant::now();
    let format = format.unwrap_or_else(|| SourceFormat::detect(file));

    let spinner = ctx.spinner();
    spinner.set_message("Loading embedding model...");
    let provider = match ctx.load_provider() {
        Ok(provider) => provider,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    let extractor = if ctx.config.extractor.enabled {
        let extractor = IngredientExtractor::new(&ctx.config.extractor)?;
        info!("Extracting ingredient names with {}", extractor.model());
        Some(extractor)
    } else {
        None
    };

    let first_scraped_number = if format == SourceFormat::Scraped {
        match stored_recipe_ids(ctx) {
            Ok(ids) => scraped::next_recipe_number(ids.iter().map(String::as_str)),
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e);
            }
        }
    } else {
        scraped::FIRST_RECIPE_NUMBER
    };

    spinner.set_message(format!("Reading {}...", file.display()));
    let batch = match sources::load(
        file,
        format,
        extractor.as_ref(),
        limit,
        first_scraped_number,
    )
    .await
    {
        Ok(batch) => batch,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    let builder = DocumentBuilder::new(&provider);
    let mut documents = Vec::with_capacity(batch.recipes.len());
    let mut rejected = batch.skipped;
    for (index, recipe) in batch.recipes.into_iter().enumerate() {
        spinner.set_message(format!("Embedding recipe {}...", index + 1));
        match builder.build(
            &recipe.recipe_id,
            recipe.ingredients,
            &recipe.name,
            Value::Object(recipe.fields),
        ) {
            Ok(document) => documents.push(document),
            Err(e) if e.is_input_error() => {
                warn!("Skipping recipe {}: {}", recipe.recipe_id, e);
                rejected += 1;
            }
            Err(e) => {
                spinner.finish_and_clear();
                return Err(e).with_context(|| {
                    format!("Failed to build document for recipe {}", recipe.recipe_id)
                });
            }
        }
    }

    if !no_validate {
        let problems = batch_problems(&documents, provider.dimension());
        if !problems.is_empty() {
            spinner.finish_and_clear();
            let mut message = format!(
                "{} of {} documents failed validation:\n  {}",
                problems.len(),
                documents.len(),
                problems
                    .iter()
                    .take(MAX_REPORTED_PROBLEMS)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n  ")
            );
            if problems.len() > MAX_REPORTED_PROBLEMS {
                message.push_str(&format!(
                    "\n  ... and {} more",
                    problems.len() - MAX_REPORTED_PROBLEMS
                ));
            }
            anyhow::bail!("{}\nRe-run with --no-validate to store them anyway.", message);
        }
    }

    if let Some(path) = &dump {
        write_dump(path, &documents)?;
        info!("Wrote {} documents to {}", documents.len(), path.display());
    }

    spinner.set_message("Storing documents...");
    let store = ctx.open_store()?;
    let mut inserted = 0;
    for document in &documents {
        if store.insert_if_absent(&document.storage_key(), document)? {
            inserted += 1;
        }
    }
    spinner.finish_and_clear();

    let report = IngestReport {
        source: display_path(file),
        format: format_name(format).to_string(),
        seen: batch.seen,
        rejected,
        built: documents.len(),
        inserted,
        duplicates: documents.len() - inserted,
        dump: dump.as_deref().map(display_path),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        inserted = report.inserted,
        duplicates = report.duplicates,
        "Ingest complete"
    );

    Output::new(report, ctx.format).render()
}
