//! Scraped recipe JSON: an array of pages with free-text ingredient lines.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use larder_core::IngredientInput;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{PendingRecipe, SourceBatch};
use crate::extractor::IngredientExtractor;

/// Lines containing any of these are page metadata, not ingredients.
const METADATA_MARKERS: &[&str] = &[
    "author:",
    "total time:",
    "yield:",
    "prep time:",
    "cook time:",
    "category:",
    "method:",
    "cuisine:",
];

/// First generated recipe number (`recipe_10001`).
pub const FIRST_RECIPE_NUMBER: usize = 10001;

/// Leading quantity: fraction, decimal, or integer with an optional range.
static QUANTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+/\d+|\d+\.\d+|\d+(?:\s*[-–]\s*\d+)?)").unwrap());

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

static GENERATED_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^recipe_(\d+)$").unwrap());

/// One scraped recipe page.
#[derive(Debug, Deserialize)]
pub struct ScrapedRecipe {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<Value>,
    #[serde(default)]
    pub prep_time: Option<Value>,
    #[serde(default)]
    pub cook_time: Option<Value>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Ingredient lines with blanks and metadata removed.
pub fn clean_lines(raw: &[Value]) -> Vec<String> {
    raw.iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            let lower = line.to_lowercase();
            !METADATA_MARKERS.iter().any(|marker| lower.contains(marker))
        })
        .map(str::to_string)
        .collect()
}

/// Lower-cased names, first occurrence kept, names of two characters or
/// fewer dropped.
pub fn unique_names(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| name.chars().count() > 2)
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

/// Minutes from a scraped time field: numbers as-is, strings by their first
/// run of digits ("15 mins" is 15).
pub fn minutes(value: Option<&Value>) -> Option<u64> {
    match value? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => DIGITS.find(s).and_then(|m| m.as_str().parse().ok()),
        _ => None,
    }
}

/// `PT<n>M`, or empty when there is no positive duration.
pub fn iso_duration(minutes: Option<u64>) -> String {
    match minutes {
        Some(m) if m > 0 => format!("PT{}M", m),
        _ => String::new(),
    }
}

/// R-style image vector, `c("<url>")`.
pub fn images_field(url: Option<&str>) -> String {
    match url.map(str::trim) {
        Some(url) if !url.is_empty() => format!("c(\"{}\")", url),
        _ => String::new(),
    }
}

/// R-style quantity vector with one entry per line, `""` when a line has no
/// leading quantity.
pub fn quantities_field(lines: &[String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let quantities: Vec<String> = lines
        .iter()
        .map(|line| {
            let quantity = QUANTITY
                .captures(line.trim())
                .and_then(|c| c.get(1))
                .map_or("", |m| m.as_str());
            format!("\"{}\"", quantity)
        })
        .collect();
    format!("c({})", quantities.join(", "))
}

/// Number to give the next generated recipe: one past the highest
/// `recipe_<n>` already stored, and never below [`FIRST_RECIPE_NUMBER`].
pub fn next_recipe_number<'a>(existing_ids: impl IntoIterator<Item = &'a str>) -> usize {
    existing_ids
        .into_iter()
        .filter_map(|id| GENERATED_ID.captures(id)?.get(1)?.as_str().parse::<usize>().ok())
        .map(|n| n + 1)
        .fold(FIRST_RECIPE_NUMBER, usize::max)
}

/// Document fields derived from the page, apart from name and ingredients.
fn fields(recipe: &ScrapedRecipe, lines: &[String]) -> Map<String, Value> {
    let prep = minutes(recipe.prep_time.as_ref());
    let cook = minutes(recipe.cook_time.as_ref());
    let total = prep.unwrap_or(0) + cook.unwrap_or(0);

    let mut fields = Map::new();
    fields.insert("prep_time".into(), Value::from(iso_duration(prep)));
    fields.insert("total_time".into(), Value::from(iso_duration(Some(total))));
    fields.insert(
        "images".into(),
        Value::from(images_field(recipe.image_url.as_deref())),
    );
    fields.insert(
        "recipe_category".into(),
        Value::from(recipe.category.clone().unwrap_or_default()),
    );
    fields.insert(
        "ingredient_quantities".into(),
        Value::from(quantities_field(lines)),
    );
    fields.insert("aggregated_rating".into(), Value::Null);
    fields.insert("calories".into(), Value::Null);
    fields
}

/// Turn parsed pages into pending recipes.
///
/// With an extractor, ingredient names come from the model; without one, the
/// cleaned lines are used as names.
/// Generated ids start at `first_number`.
pub async fn convert(
    pages: Vec<ScrapedRecipe>,
    extractor: Option<&IngredientExtractor>,
    limit: Option<usize>,
    first_number: usize,
) -> SourceBatch {
    let mut batch = SourceBatch::default();

    for page in pages {
        if limit.is_some_and(|limit| batch.recipes.len() >= limit) {
            break;
        }
        batch.seen += 1;

        let title = page
            .title
            .clone()
            .unwrap_or_else(|| "Unknown Recipe".to_string());
        let lines = clean_lines(&page.ingredients);
        if lines.is_empty() {
            warn!("No valid ingredients found for recipe '{}', skipping", title);
            batch.skipped += 1;
            continue;
        }

        let names = match extractor {
            Some(extractor) => unique_names(extractor.extract(&lines.join(", ")).await),
            None => unique_names(lines.iter().cloned()),
        };
        if names.is_empty() {
            warn!("No ingredient names extracted for recipe '{}', skipping", title);
            batch.skipped += 1;
            continue;
        }

        let recipe = PendingRecipe {
            recipe_id: format!("recipe_{}", first_number + batch.recipes.len()),
            name: title,
            ingredients: IngredientInput::Sequence(names),
            fields: fields(&page, &lines),
        };
        debug!(recipe_id = %recipe.recipe_id, "Accepted scraped recipe");
        batch.recipes.push(recipe);
    }

    batch
}

/// Read a scraped JSON file.
pub async fn load(
    path: &Path,
    extractor: Option<&IngredientExtractor>,
    limit: Option<usize>,
    first_number: usize,
) -> anyhow::Result<SourceBatch> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let pages: Vec<ScrapedRecipe> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of recipes", path.display()))?;
    Ok(convert(pages, extractor, limit, first_number).await)
}
