//! Validate command - check stored documents for integrity problems

use colored::Colorize;
use larder_core::{RecipeDocument, RecipeStore};
use serde::Serialize;
use tracing::warn;

use super::AppContext;
use crate::output::{Output, TableDisplay};

#[derive(Debug, Clone, Serialize)]
pub struct InvalidRecipe {
    pub key: String,
    pub problems: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub checked: usize,
    pub valid: usize,
    /// Dimension the documents were checked against, when the model was loaded.
    pub expected_dim: Option<usize>,
    pub invalid: Vec<InvalidRecipe>,
}

impl ValidationReport {
    pub fn check(documents: &[RecipeDocument], expected_dim: Option<usize>) -> Self {
        let invalid: Vec<InvalidRecipe> = documents
            .iter()
            .filter_map(|doc| {
                let problems = doc.problems(expected_dim);
                (!problems.is_empty()).then(|| InvalidRecipe {
                    key: doc.storage_key(),
                    problems,
                })
            })
            .collect();
        Self {
            checked: documents.len(),
            valid: documents.len() - invalid.len(),
            expected_dim,
            invalid,
        }
    }
}

impl TableDisplay for ValidationReport {
    fn to_table(&self) -> String {
        let mut output = format!("{}\n\n", "VALIDATION".cyan().bold());
        output.push_str(&format!(
            "Checked {} recipes: {} valid, {} invalid\n",
            self.checked,
            self.valid.to_string().green(),
            if self.invalid.is_empty() {
                "0".normal()
            } else {
                self.invalid.len().to_string().red()
            }
        ));
        if self.expected_dim.is_none() {
            output.push_str(&format!(
                "{}\n",
                "Model not loaded; embedding dimensions checked against embedding_dim only"
                    .dimmed()
            ));
        }
        for recipe in &self.invalid {
            output.push_str(&format!("\n{}\n", recipe.key.yellow()));
            for problem in &recipe.problems {
                output.push_str(&format!("  - {}\n", problem));
            }
        }
        output.trim_end().to_string()
    }
}

/// Run the validate command
pub async fn run(ctx: &AppContext) -> anyhow::Result<()> {
    let store = ctx.open_store_read_only()?;

    let expected_dim = if ctx.model_available() {
        Some(ctx.load_provider()?.dimension())
    } else {
        warn!(
            "No model at {}, skipping model dimension check",
            ctx.model_dir.display()
        );
        None
    };

    let documents = store.get_all()?;
    let report = ValidationReport::check(&documents, expected_dim);
    let failed = !report.invalid.is_empty();

    Output::new(report, ctx.format).render()?;
    if failed {
        anyhow::bail!("Catalog contains invalid documents");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_counts() {
        let documents: Vec<RecipeDocument> = vec![
            serde_json::from_value(json!({
                "recipe_id": "1",
                "recipe_name": "Soup",
                "ingredients": ["water"],
                "embedding": [1.0, 0.0],
                "embedding_dim": 2,
            }))
            .unwrap(),
            serde_json::from_value(json!({
                "recipe_id": "2",
                "recipe_name": "",
                "ingredients": ["water"],
            }))
            .unwrap(),
        ];

        let report = ValidationReport::check(&documents, Some(2));
        assert_eq!(report.checked, 2);
        assert_eq!(report.valid, 1);
        assert_eq!(report.invalid[0].key, "recipe::2");
        assert!(report.invalid[0]
            .problems
            .contains(&"missing recipe_name".to_string()));

        // A different model dimension invalidates the first one too.
        assert_eq!(ValidationReport::check(&documents, Some(384)).valid, 0);
    }
}
