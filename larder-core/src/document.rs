//! Recipe documents and the builder that produces them at ingestion time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::{CoreError, Result};
use crate::ingredients::{normalize, IngredientInput};

/// Value of the `type` field on every recipe document.
pub const DOCUMENT_TYPE: &str = "recipe";

/// Prefix of the storage key used for ingested recipes.
pub const KEY_PREFIX: &str = "recipe::";

fn default_document_type() -> String {
    DOCUMENT_TYPE.to_string()
}

/// Persistable recipe record.
///
/// Field names match the stored schema. Fields this type does not know about
/// are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDocument {
    #[serde(rename = "type", default = "default_document_type")]
    pub doc_type: String,
    pub recipe_id: String,
    #[serde(default)]
    pub recipe_name: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub ingredients_text: String,
    /// Absent on records that have not been embedded yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub embedding_dim: Option<usize>,
    #[serde(default)]
    pub prep_time: Option<String>,
    #[serde(default)]
    pub total_time: Option<String>,
    #[serde(default)]
    pub images: Option<String>,
    #[serde(default)]
    pub recipe_category: Option<String>,
    #[serde(default)]
    pub ingredient_quantities: Option<String>,
    #[serde(default)]
    pub aggregated_rating: Option<f64>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecipeDocument {
    /// Storage key for a recipe id (`recipe::<id>`).
    pub fn key_for(recipe_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, recipe_id)
    }

    pub fn storage_key(&self) -> String {
        Self::key_for(&self.recipe_id)
    }

    /// Whether the record carries an embedding.
    pub fn is_indexed(&self) -> bool {
        self.embedding.is_some()
    }

    /// First image URL from an R-style `c("url1", "url2")` images field.
    pub fn first_image_url(&self) -> Option<&str> {
        let images = self.images.as_deref()?;
        let start = images.find("\"http")? + 1;
        let rest = &images[start..];
        let end = rest.find('"')?;
        Some(&rest[..end])
    }

    /// Reasons this document would fail integrity checks, empty when valid.
    ///
    /// `expected_dim` is the dimension of the model currently in use, if known.
    pub fn problems(&self, expected_dim: Option<usize>) -> Vec<String> {
        let mut problems = Vec::new();
        if self.recipe_id.trim().is_empty() {
            problems.push("missing recipe_id".to_string());
        }
        if self.recipe_name.trim().is_empty() {
            problems.push("missing recipe_name".to_string());
        }
        if self.ingredients.is_empty() {
            problems.push("no ingredients".to_string());
        }
        match &self.embedding {
            None => problems.push("no embedding".to_string()),
            Some(embedding) => {
                if self.embedding_dim != Some(embedding.len()) {
                    problems.push(format!(
                        "embedding has {} values but embedding_dim is {:?}",
                        embedding.len(),
                        self.embedding_dim
                    ));
                }
                if let Some(expected) = expected_dim {
                    if embedding.len() != expected {
                        problems.push(format!(
                            "embedding has {} values, model produces {}",
                            embedding.len(),
                            expected
                        ));
                    }
                }
            }
        }
        problems
    }
}

/// Builds [`RecipeDocument`]s: normalize, embed, attach metadata.
pub struct DocumentBuilder<'a> {
    provider: &'a EmbeddingProvider,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(provider: &'a EmbeddingProvider) -> Self {
        Self { provider }
    }

    /// Build a document for one recipe.
    ///
    /// `extra_fields` is merged over the computed fields, so callers can
    /// override any default (for example `recipe_category` or `created_at`).
    /// Non-object `extra_fields` values other than `null` are rejected.
    ///
    /// # Errors
    ///
    /// Propagates normalization and embedding errors unchanged. Returns
    /// [`CoreError::InvalidDocument`] if the merged record no longer has the
    /// document shape, and [`CoreError::DimensionMismatch`] if the final
    /// embedding disagrees with `embedding_dim`. Nothing is returned on failure.
    pub fn build(
        &self,
        recipe_id: &str,
        raw_ingredients: impl Into<IngredientInput>,
        recipe_name: &str,
        extra_fields: Value,
    ) -> Result<RecipeDocument> {
        let ingredients = normalize(raw_ingredients)?;
        let embedding = self.provider.embed(&ingredients)?;

        let mut record = Map::new();
        record.insert("type".into(), Value::from(DOCUMENT_TYPE));
        record.insert("recipe_id".into(), Value::from(recipe_id));
        record.insert("recipe_name".into(), Value::from(recipe_name));
        record.insert("ingredients_text".into(), Value::from(ingredients.to_text()));
        record.insert("ingredients".into(), Value::from(ingredients.into_vec()));
        record.insert("embedding".into(), Value::from(embedding));
        record.insert(
            "embedding_model".into(),
            Value::from(self.provider.model_name()),
        );
        record.insert("embedding_dim".into(), Value::from(self.provider.dimension()));
        record.insert(
            "created_at".into(),
            Value::from(chrono::Utc::now().to_rfc3339()),
        );

        match extra_fields {
            Value::Null => {}
            Value::Object(extra) => record.extend(extra),
            other => {
                return Err(CoreError::InvalidDocument(format!(
                    "extra fields must be an object, got {}",
                    other
                )))
            }
        }

        let document: RecipeDocument = serde_json::from_value(Value::Object(record))
            .map_err(|e| CoreError::InvalidDocument(e.to_string()))?;

        if let Some(embedding) = &document.embedding {
            let declared = document.embedding_dim.unwrap_or(0);
            if embedding.len() != declared {
                return Err(CoreError::DimensionMismatch {
                    expected: declared,
                    actual: embedding.len(),
                });
            }
        }

        debug!(
            recipe_id = %document.recipe_id,
            ingredients = document.ingredients.len(),
            "Built recipe document"
        );

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::CharModel;
    use serde_json::json;

    fn provider() -> EmbeddingProvider {
        EmbeddingProvider::new(CharModel::new(16)).unwrap()
    }

    #[test]
    fn test_build_computes_fields() {
        let provider = provider();
        let doc = DocumentBuilder::new(&provider)
            .build("42", "Chicken, Tomato, Onion", "Chicken stew", Value::Null)
            .unwrap();

        assert_eq!(doc.doc_type, "recipe");
        assert_eq!(doc.recipe_id, "42");
        assert_eq!(doc.recipe_name, "Chicken stew");
        assert_eq!(doc.ingredients, vec!["chicken", "tomato", "onion"]);
        assert_eq!(doc.ingredients_text, "chicken, tomato, onion");
        assert_eq!(doc.embedding_model.as_deref(), Some("char-model"));
        assert_eq!(doc.embedding_dim, Some(16));
        assert_eq!(doc.embedding.as_ref().map(Vec::len), Some(16));
        assert!(doc.created_at.is_some());
        assert_eq!(doc.storage_key(), "recipe::42");
        assert!(doc.problems(Some(16)).is_empty());
    }

    #[test]
    fn test_extra_fields_take_precedence() {
        let provider = provider();
        let doc = DocumentBuilder::new(&provider)
            .build(
                "7",
                vec!["rice".to_string(), "beans".to_string()],
                "Rice and beans",
                json!({
                    "recipe_category": "Dinner",
                    "calories": 420.5,
                    "created_at": "2024-01-01T00:00:00",
                    "cuisine": "Cajun",
                }),
            )
            .unwrap();

        assert_eq!(doc.recipe_category.as_deref(), Some("Dinner"));
        assert_eq!(doc.calories, Some(420.5));
        assert_eq!(doc.created_at.as_deref(), Some("2024-01-01T00:00:00"));
        assert_eq!(doc.extra.get("cuisine"), Some(&json!("Cajun")));
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let provider = provider();
        let doc = DocumentBuilder::new(&provider)
            .build("1", "salt", "Salt", json!({"servings": 4}))
            .unwrap();

        let encoded = serde_json::to_value(&doc).unwrap();
        assert_eq!(encoded["servings"], json!(4));
        assert_eq!(encoded["type"], json!("recipe"));

        let decoded: RecipeDocument = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, doc);
    }

    #[test]
    fn test_build_is_all_or_nothing() {
        let provider = provider();
        let builder = DocumentBuilder::new(&provider);

        assert!(matches!(
            builder.build("1", " , ", "Nothing", Value::Null),
            Err(CoreError::EmptyIngredientSet)
        ));
        assert!(matches!(
            builder.build("1", "__fail__", "Broken", Value::Null),
            Err(CoreError::EmbeddingUnavailable(_))
        ));
        assert!(matches!(
            builder.build("1", "salt", "Bad", json!(["not", "an", "object"])),
            Err(CoreError::InvalidDocument(_))
        ));
        assert!(matches!(
            builder.build("1", "salt", "Bad", json!({"calories": "lots"})),
            Err(CoreError::InvalidDocument(_))
        ));
        assert!(matches!(
            builder.build("1", "salt", "Bad", json!({"embedding_dim": 3})),
            Err(CoreError::DimensionMismatch {
                expected: 3,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_missing_embedding_is_tolerated_on_read() {
        let doc: RecipeDocument = serde_json::from_value(json!({
            "recipe_id": "9",
            "recipe_name": "Toast",
            "ingredients": ["bread"],
        }))
        .unwrap();

        assert!(!doc.is_indexed());
        assert_eq!(doc.doc_type, "recipe");
        assert_eq!(doc.problems(None), vec!["no embedding".to_string()]);
    }

    #[test]
    fn test_first_image_url() {
        let mut doc: RecipeDocument =
            serde_json::from_value(json!({"recipe_id": "1"})).unwrap();
        assert_eq!(doc.first_image_url(), None);

        doc.images = Some(
            r#"c("https://img.example/a.jpg", "https://img.example/b.jpg")"#.to_string(),
        );
        assert_eq!(doc.first_image_url(), Some("https://img.example/a.jpg"));
    }
}
