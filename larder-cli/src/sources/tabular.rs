//! Tabular recipe export (CSV) with R-vector ingredient columns.

use std::path::Path;

use anyhow::Context;
use larder_core::IngredientInput;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{PendingRecipe, SourceBatch};
use crate::extractor::IngredientExtractor;

/// One CSV row. Every column is required; rows missing any are dropped.
#[derive(Debug, Deserialize)]
pub struct RecipeRow {
    #[serde(rename = "RecipeId")]
    pub recipe_id: Option<String>,
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "PrepTime")]
    pub prep_time: Option<String>,
    #[serde(rename = "TotalTime")]
    pub total_time: Option<String>,
    #[serde(rename = "Images")]
    pub images: Option<String>,
    #[serde(rename = "RecipeCategory")]
    pub recipe_category: Option<String>,
    #[serde(rename = "RecipeIngredientQuantities")]
    pub ingredient_quantities: Option<String>,
    #[serde(rename = "RecipeIngredientParts")]
    pub ingredient_parts: Option<String>,
    #[serde(rename = "AggregatedRating")]
    pub aggregated_rating: Option<String>,
    #[serde(rename = "Calories")]
    pub calories: Option<String>,
}

/// Row with every column present and numbers parsed.
struct CompleteRow {
    recipe_id: String,
    name: String,
    prep_time: String,
    total_time: String,
    images: String,
    recipe_category: String,
    ingredient_quantities: String,
    ingredient_parts: String,
    aggregated_rating: f64,
    calories: f64,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != "NA")
}

impl RecipeRow {
    fn complete(self) -> Option<CompleteRow> {
        Some(CompleteRow {
            recipe_id: present(self.recipe_id)?,
            name: present(self.name)?,
            prep_time: present(self.prep_time)?,
            total_time: present(self.total_time)?,
            images: present(self.images)?,
            recipe_category: present(self.recipe_category)?,
            ingredient_quantities: present(self.ingredient_quantities)?,
            ingredient_parts: present(self.ingredient_parts)?,
            aggregated_rating: present(self.aggregated_rating)?.parse().ok()?,
            calories: present(self.calories)?.parse().ok()?,
        })
    }
}

/// Unpack an R character vector, `c("a", "b")`, into its elements.
///
/// A value without the `c(...)` wrapper is one element.
pub fn unpack_r_vector(value: &str) -> Vec<String> {
    let value = value.trim();
    let inner = value
        .strip_prefix("c(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(value);

    let mut items = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in inner.chars() {
        match ch {
            '"' => quoted = !quoted,
            ',' if !quoted => items.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty() && item != "NA")
        .collect()
}

fn fields(row: &CompleteRow) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("prep_time".into(), Value::from(row.prep_time.as_str()));
    fields.insert("total_time".into(), Value::from(row.total_time.as_str()));
    fields.insert("images".into(), Value::from(row.images.as_str()));
    fields.insert(
        "recipe_category".into(),
        Value::from(row.recipe_category.as_str()),
    );
    fields.insert(
        "ingredient_quantities".into(),
        Value::from(row.ingredient_quantities.as_str()),
    );
    fields.insert(
        "aggregated_rating".into(),
        Value::from(row.aggregated_rating),
    );
    fields.insert("calories".into(), Value::from(row.calories));
    fields
}

/// Turn CSV rows into pending recipes, optionally cleaning ingredient parts
/// through the extractor.
pub async fn convert(
    rows: impl IntoIterator<Item = RecipeRow>,
    extractor: Option<&IngredientExtractor>,
    limit: Option<usize>,
) -> SourceBatch {
    let mut batch = SourceBatch::default();

    for row in rows {
        if limit.is_some_and(|limit| batch.recipes.len() >= limit) {
            break;
        }
        batch.seen += 1;

        let Some(row) = row.complete() else {
            debug!("Dropping row {} with missing values", batch.seen);
            batch.skipped += 1;
            continue;
        };

        let parts = unpack_r_vector(&row.ingredient_parts);
        let names = match extractor {
            Some(extractor) => extractor.extract(&parts.join(", ")).await,
            None => parts,
        };
        if names.is_empty() {
            warn!("No ingredients for recipe {}, skipping", row.recipe_id);
            batch.skipped += 1;
            continue;
        }

        batch.recipes.push(PendingRecipe {
            fields: fields(&row),
            ingredients: IngredientInput::Sequence(names),
            recipe_id: row.recipe_id,
            name: row.name,
        });
    }

    batch
}

/// Read a CSV export.
pub async fn load(
    path: &Path,
    extractor: Option<&IngredientExtractor>,
    limit: Option<usize>,
) -> anyhow::Result<SourceBatch> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let rows = reader
        .deserialize::<RecipeRow>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(convert(rows, extractor, limit).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HEADER: &str = "RecipeId,Name,AuthorId,PrepTime,TotalTime,Images,RecipeCategory,\
RecipeIngredientQuantities,RecipeIngredientParts,AggregatedRating,Calories\n";

    fn parse(csv_text: &str) -> Vec<RecipeRow> {
        csv::Reader::from_reader(csv_text.as_bytes())
            .deserialize()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_unpack_r_vector() {
        assert_eq!(
            unpack_r_vector(r#"c("blueberries", "granulated sugar", "lemon juice")"#),
            vec!["blueberries", "granulated sugar", "lemon juice"]
        );
        assert_eq!(unpack_r_vector(r#"c("salt, kosher", "NA")"#), vec!["salt, kosher"]);
        assert_eq!(unpack_r_vector("\"butter\""), vec!["butter"]);
        assert!(unpack_r_vector("c()").is_empty());
    }

    #[tokio::test]
    async fn test_convert_rows() {
        let text = format!(
            "{}{}{}",
            HEADER,
            r#"38,Low-Fat Berry Blue Frozen Dessert,1533,PT24H,PT24H45M,"c(""https://img.example/38.jpg"")",Frozen Desserts,"c(""4"", ""1/4"")","c(""blueberries"", ""granulated sugar"")",4.5,170.9
"#,
            r#"39,Biryani,1567,PT25M,PT4H25M,,Chicken Breast,"c(""1"")","c(""saffron"")",3,1110.7
"#
        );

        let batch = convert(parse(&text), None, None).await;
        assert_eq!(batch.seen, 2);
        // Second row has no images.
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.recipes.len(), 1);

        let recipe = &batch.recipes[0];
        assert_eq!(recipe.recipe_id, "38");
        assert_eq!(recipe.name, "Low-Fat Berry Blue Frozen Dessert");
        assert_eq!(
            recipe.ingredients,
            IngredientInput::Sequence(vec!["blueberries".into(), "granulated sugar".into()])
        );
        assert_eq!(recipe.fields["total_time"], json!("PT24H45M"));
        assert_eq!(recipe.fields["images"], json!("c(\"https://img.example/38.jpg\")"));
        assert_eq!(recipe.fields["aggregated_rating"], json!(4.5));
        assert_eq!(recipe.fields["calories"], json!(170.9));
    }

    #[tokio::test]
    async fn test_unparseable_number_drops_row() {
        let text = format!(
            "{}{}",
            HEADER,
            r#"40,Stew,1,PT1H,PT2H,"c(""x"")",Stew,"c(""1"")","c(""beef"")",lots,300
"#
        );
        let batch = convert(parse(&text), None, None).await;
        assert!(batch.recipes.is_empty());
        assert_eq!(batch.skipped, 1);
    }
}
