//! Search command - recommend recipes for a list of ingredients
//!
//! Embeds the normalized ingredient list and ranks every stored recipe by
//! cosine similarity.

use std::time::Instant;

use colored::Colorize;
use larder_core::{RecipeDocument, Recommender, RecommenderSettings, SimilarityResult};
use serde::Serialize;
use tabled::{builder::Builder, settings::Style};

use super::AppContext;
use crate::constants::INGREDIENT_PREVIEW;
use crate::output::{truncate, Output, TableDisplay};

/// One recommended recipe.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub rank: usize,
    pub key: String,
    pub recipe_id: String,
    pub name: String,
    pub score: f32,
    pub category: Option<String>,
    pub calories: Option<f64>,
    pub image: Option<String>,
    /// First few ingredients.
    pub ingredients: Vec<String>,
    pub ingredient_count: usize,
}

impl From<SimilarityResult<&RecipeDocument>> for SearchHit {
    fn from(result: SimilarityResult<&RecipeDocument>) -> Self {
        let doc = result.document;
        Self {
            rank: result.rank,
            key: doc.storage_key(),
            recipe_id: doc.recipe_id.clone(),
            name: doc.recipe_name.clone(),
            score: result.score,
            category: doc.recipe_category.clone().filter(|c| !c.is_empty()),
            calories: doc.calories,
            image: doc.first_image_url().map(str::to_string),
            ingredients: doc
                .ingredients
                .iter()
                .take(INGREDIENT_PREVIEW)
                .cloned()
                .collect(),
            ingredient_count: doc.ingredients.len(),
        }
    }
}

/// Search results collection
#[derive(Debug, Serialize)]
pub struct SearchResults {
    /// Normalized query ingredients.
    pub query: Vec<String>,
    pub top_k: usize,
    pub min_similarity: f32,
    pub catalog_size: usize,
    pub results: Vec<SearchHit>,
    pub duration_ms: u64,
}

fn score_cell(score: f32) -> String {
    let text = format!("{:.3}", score);
    if score >= 0.7 {
        text.green().to_string()
    } else if score >= 0.4 {
        text.yellow().to_string()
    } else {
        text.red().to_string()
    }
}

impl TableDisplay for SearchResults {
    fn to_table(&self) -> String {
        let mut output = format!(
            "{} {}\n",
            "SEARCH:".cyan().bold(),
            self.query.join(", ")
        );
        output.push_str(&format!(
            "Found {} of {} recipes in {}ms (top {}, min similarity {})\n\n",
            self.results.len().to_string().green(),
            self.catalog_size,
            self.duration_ms,
            self.top_k,
            self.min_similarity
        ));

        if self.results.is_empty() {
            output.push_str(&format!("{}", "No matching recipes.".dimmed()));
            return output;
        }

        let mut builder = Builder::default();
        builder.push_record(["#", "Recipe", "Score", "Category", "Calories", "Ingredients"]);
        for hit in &self.results {
            let mut ingredients = hit.ingredients.join(", ");
            if hit.ingredient_count > hit.ingredients.len() {
                ingredients.push_str(&format!(
                    " (+{})",
                    hit.ingredient_count - hit.ingredients.len()
                ));
            }
            builder.push_record([
                hit.rank.to_string(),
                truncate(&hit.name, 40),
                score_cell(hit.score),
                hit.category.clone().unwrap_or_else(|| "-".to_string()),
                hit.calories
                    .map(|c| format!("{:.0}", c))
                    .unwrap_or_else(|| "-".to_string()),
                truncate(&ingredients, 60),
            ]);
        }

        let mut table = builder.build();
        table.with(Style::rounded());
        output.push_str(&table.to_string());

        let images: Vec<String> = self
            .results
            .iter()
            .filter_map(|hit| {
                hit.image
                    .as_ref()
                    .map(|url| format!("  {}. {}", hit.rank, url.dimmed()))
            })
            .collect();
        if !images.is_empty() {
            output.push_str(&format!("\n\n{}\n{}", "Images:".dimmed(), images.join("\n")));
        }

        output.push_str(&format!(
            "\n\n{}",
            "Tip: Use 'larder get <key>' to view a full recipe".dimmed()
        ));
        output
    }
}

/// Run the search command
pub async fn run(
    ctx: &AppContext,
    ingredients: &str,
    top_k: Option<usize>,
    min_similarity: Option<f32>,
) -> anyhow::Result<()> {
    if ingredients.trim().is_empty() {
        anyhow::bail!("Ingredient list cannot be empty. Try: larder search \"chicken, rice\"");
    }

    let start = Instant::now();
    let store = ctx.open_store_read_only()?;

    let spinner = ctx.spinner();
    spinner.set_message("Loading embedding model...");
    let provider = match ctx.load_provider() {
        Ok(provider) => provider,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    let settings = RecommenderSettings {
        top_k: ctx.config.search.top_k,
        min_similarity: ctx.config.search.min_similarity,
    };
    let mut recommender = Recommender::new(settings);
    recommender.initialize(provider, store);

    spinner.set_message("Ranking recipes...");
    let recommendations = recommender.recommend(ingredients, top_k, min_similarity);
    spinner.finish_and_clear();
    let recommendations = recommendations?;

    let results = SearchResults {
        query: recommendations.query().as_slice().to_vec(),
        top_k: top_k.unwrap_or(settings.top_k),
        min_similarity: min_similarity.unwrap_or(settings.min_similarity),
        catalog_size: recommendations.catalog_size(),
        results: recommendations
            .results()
            .into_iter()
            .map(SearchHit::from)
            .collect(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    Output::new(results, ctx.format).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> RecipeDocument {
        serde_json::from_value(json!({
            "recipe_id": "38",
            "recipe_name": "Low-Fat Berry Blue Frozen Dessert",
            "ingredients": ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"],
            "images": "c(\"https://img.example/38.jpg\", \"https://img.example/38b.jpg\")",
            "recipe_category": "Frozen Desserts",
            "calories": 170.9,
        }))
        .unwrap()
    }

    #[test]
    fn test_hit_from_result() {
        let doc = document();
        let hit = SearchHit::from(SimilarityResult {
            document: &doc,
            score: 0.82,
            rank: 1,
        });

        assert_eq!(hit.key, "recipe::38");
        assert_eq!(hit.ingredients.len(), 10);
        assert_eq!(hit.ingredient_count, 12);
        assert_eq!(hit.image.as_deref(), Some("https://img.example/38.jpg"));
        assert_eq!(hit.category.as_deref(), Some("Frozen Desserts"));
    }

    #[test]
    fn test_table_lists_hits() {
        colored::control::set_override(false);
        let doc = document();
        let results = SearchResults {
            query: vec!["blueberries".to_string()],
            top_k: 5,
            min_similarity: 0.1,
            catalog_size: 1,
            results: vec![SearchHit::from(SimilarityResult {
                document: &doc,
                score: 0.82,
                rank: 1,
            })],
            duration_ms: 3,
        };

        let table = results.to_table();
        assert!(table.contains("0.820"));
        assert!(table.contains("Frozen Desserts"));
        assert!(table.contains("(+2)"));
        assert!(table.contains("https://img.example/38.jpg"));
    }

    #[test]
    fn test_empty_results_message() {
        colored::control::set_override(false);
        let results = SearchResults {
            query: vec!["saffron".to_string()],
            top_k: 5,
            min_similarity: 0.9,
            catalog_size: 3,
            results: Vec::new(),
            duration_ms: 1,
        };
        assert!(results.to_table().contains("No matching recipes."));
    }
}
