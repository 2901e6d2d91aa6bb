//! Get command - show one stored recipe

use colored::Colorize;
use larder_core::document::KEY_PREFIX;
use larder_core::{RecipeDocument, RecipeStore, StoreError};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use super::AppContext;
use crate::output::{truncate, Output, TableDisplay};

/// A stored recipe. JSON output is the full document.
#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct RecipeView {
    pub document: RecipeDocument,
}

fn or_dash(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => "-".to_string(),
    }
}

impl TableDisplay for RecipeView {
    fn to_table(&self) -> String {
        let doc = &self.document;
        let mut output = format!(
            "{} {}\n\n",
            "RECIPE:".cyan().bold(),
            doc.recipe_name.bold()
        );

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        builder.push_record(["key".to_string(), doc.storage_key()]);
        builder.push_record(["recipe_id".to_string(), doc.recipe_id.clone()]);
        builder.push_record([
            "category".to_string(),
            or_dash(doc.recipe_category.as_deref()),
        ]);
        builder.push_record(["prep_time".to_string(), or_dash(doc.prep_time.as_deref())]);
        builder.push_record(["total_time".to_string(), or_dash(doc.total_time.as_deref())]);
        builder.push_record([
            "rating".to_string(),
            doc.aggregated_rating
                .map(|r| format!("{:.1}", r))
                .unwrap_or_else(|| "-".to_string()),
        ]);
        builder.push_record([
            "calories".to_string(),
            doc.calories
                .map(|c| format!("{:.1}", c))
                .unwrap_or_else(|| "-".to_string()),
        ]);
        builder.push_record([
            "embedding".to_string(),
            match (&doc.embedding, &doc.embedding_model) {
                (Some(e), Some(model)) => format!("{} dims ({})", e.len(), model),
                (Some(e), None) => format!("{} dims", e.len()),
                (None, _) => "none".to_string(),
            },
        ]);
        builder.push_record(["image".to_string(), or_dash(doc.first_image_url())]);
        builder.push_record(["created_at".to_string(), or_dash(doc.created_at.as_deref())]);

        let mut table = builder.build();
        table.with(Style::rounded());
        output.push_str(&table.to_string());

        output.push_str(&format!(
            "\n\n{} ({})\n",
            "Ingredients".bold(),
            doc.ingredients.len()
        ));
        for ingredient in &doc.ingredients {
            output.push_str(&format!("  - {}\n", truncate(ingredient, 80)));
        }
        if let Some(quantities) = doc.ingredient_quantities.as_deref().filter(|q| !q.is_empty()) {
            output.push_str(&format!("\n{} {}", "Quantities:".dimmed(), quantities));
        }
        output.trim_end().to_string()
    }
}

/// Look up `key`, falling back to treating it as a bare recipe id.
pub fn find(store: &dyn RecipeStore, key: &str) -> anyhow::Result<RecipeDocument> {
    match store.get(key) {
        Ok(doc) => Ok(doc),
        Err(StoreError::NotFound(_)) if !key.starts_with(KEY_PREFIX) => {
            match store.get(&RecipeDocument::key_for(key)) {
                Ok(doc) => Ok(doc),
                Err(StoreError::NotFound(_)) => anyhow::bail!("Recipe not found: {}", key),
                Err(e) => Err(e.into()),
            }
        }
        Err(StoreError::NotFound(_)) => anyhow::bail!("Recipe not found: {}", key),
        Err(e) => Err(e.into()),
    }
}

/// Run the get command
pub async fn run(ctx: &AppContext, key: &str) -> anyhow::Result<()> {
    let store = ctx.open_store_read_only()?;
    let document = find(&store, key)?;
    Output::new(RecipeView { document }, ctx.format).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_core::MemoryStore;
    use serde_json::json;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        let doc: RecipeDocument = serde_json::from_value(json!({
            "recipe_id": "38",
            "recipe_name": "Berry Dessert",
            "ingredients": ["blueberries", "sugar"],
            "embedding": [0.6, 0.8],
            "embedding_model": "all-MiniLM-L6-v2",
            "embedding_dim": 2,
            "calories": 170.9,
        }))
        .unwrap();
        store.insert_if_absent("recipe::38", &doc).unwrap();
        store
    }

    #[test]
    fn test_find_by_key_or_id() {
        let store = store();
        assert_eq!(find(&store, "recipe::38").unwrap().recipe_id, "38");
        assert_eq!(find(&store, "38").unwrap().recipe_id, "38");
    }

    #[test]
    fn test_find_missing() {
        let err = find(&store(), "99").unwrap_err();
        assert!(err.to_string().contains("Recipe not found: 99"));
    }

    #[test]
    fn test_view_table_and_json() {
        colored::control::set_override(false);
        let view = RecipeView {
            document: find(&store(), "38").unwrap(),
        };
        let table = view.to_table();
        assert!(table.contains("Berry Dessert"));
        assert!(table.contains("2 dims (all-MiniLM-L6-v2)"));
        assert!(table.contains("  - blueberries"));

        let json: serde_json::Value = serde_json::to_value(&view).unwrap();
        assert_eq!(json["recipe_id"], "38");
        assert_eq!(json["type"], "recipe");
    }
}
