//! Recommendation service tying the provider, the store and the ranker together.
//!
//! The service has an explicit lifecycle: it is created uninitialized and every
//! query or ingest call fails with [`CoreError::NotInitialized`] until
//! [`Recommender::initialize`] has been given an embedding provider and a store.

use serde_json::Value;
use tracing::{debug, info};

use crate::document::{DocumentBuilder, RecipeDocument};
use crate::embedding::EmbeddingProvider;
use crate::error::{CoreError, Result};
use crate::ingredients::{normalize, IngredientInput, IngredientSet};
use crate::similarity::{rank, SimilarityResult};
use crate::store::RecipeStore;

/// Default number of recommendations returned.
pub const DEFAULT_TOP_K: usize = 5;

/// Default minimum cosine similarity for a recommendation.
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.1;

/// Query defaults applied when a call does not specify its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommenderSettings {
    pub top_k: usize,
    pub min_similarity: f32,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

/// Ranked recommendations over one catalog snapshot.
///
/// Owns the snapshot; hits are kept as positions into it so no document or
/// embedding is duplicated.
#[derive(Debug)]
pub struct Recommendations {
    query: IngredientSet,
    catalog: Vec<RecipeDocument>,
    hits: Vec<SimilarityResult<usize>>,
}

impl Recommendations {
    /// Normalized ingredients the query was built from.
    pub fn query(&self) -> &IngredientSet {
        &self.query
    }

    /// Size of the catalog snapshot that was ranked.
    pub fn catalog_size(&self) -> usize {
        self.catalog.len()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Results in rank order, borrowing from the snapshot.
    pub fn results(&self) -> Vec<SimilarityResult<&RecipeDocument>> {
        self.hits
            .iter()
            .map(|hit| SimilarityResult {
                document: &self.catalog[hit.document],
                score: hit.score,
                rank: hit.rank,
            })
            .collect()
    }
}

/// Outcome of ingesting one recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub key: String,
    /// `false` when a document already existed under the key.
    pub inserted: bool,
}

struct Dependencies {
    provider: EmbeddingProvider,
    store: Box<dyn RecipeStore>,
}

/// Recipe recommendation service.
pub struct Recommender {
    settings: RecommenderSettings,
    deps: Option<Dependencies>,
}

impl Recommender {
    /// Create an uninitialized service.
    pub fn new(settings: RecommenderSettings) -> Self {
        Self {
            settings,
            deps: None,
        }
    }

    /// Install the embedding provider and store. Replaces any previous pair.
    pub fn initialize(&mut self, provider: EmbeddingProvider, store: impl RecipeStore + 'static) {
        info!(
            model = provider.model_name(),
            dimension = provider.dimension(),
            "Recommender initialized"
        );
        self.deps = Some(Dependencies {
            provider,
            store: Box::new(store),
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.deps.is_some()
    }

    pub fn settings(&self) -> RecommenderSettings {
        self.settings
    }

    fn deps(&self) -> Result<&Dependencies> {
        self.deps
            .as_ref()
            .ok_or(CoreError::NotInitialized("recommender has no provider or store"))
    }

    pub fn provider(&self) -> Result<&EmbeddingProvider> {
        Ok(&self.deps()?.provider)
    }

    pub fn store(&self) -> Result<&dyn RecipeStore> {
        Ok(self.deps()?.store.as_ref())
    }

    /// Embed the ingredients and rank the stored catalog against them.
    ///
    /// `top_k` and `min_similarity` fall back to the service settings.
    pub fn recommend(
        &self,
        ingredients: impl Into<IngredientInput>,
        top_k: Option<usize>,
        min_similarity: Option<f32>,
    ) -> Result<Recommendations> {
        let deps = self.deps()?;
        let top_k = top_k.unwrap_or(self.settings.top_k);
        let min_similarity = min_similarity.unwrap_or(self.settings.min_similarity);

        let query = normalize(ingredients)?;
        let query_vector = deps.provider.embed(&query)?;
        let catalog = deps.store.get_all()?;

        let positions: Vec<usize> = (0..catalog.len()).collect();
        let hits = rank(
            &query_vector,
            positions
                .iter()
                .zip(&catalog)
                .map(|(position, doc)| (position, doc.embedding.as_deref())),
            top_k,
            min_similarity,
        )
        .into_iter()
        .map(|hit| SimilarityResult {
            document: *hit.document,
            score: hit.score,
            rank: hit.rank,
        })
        .collect();

        let recommendations = Recommendations {
            query,
            catalog,
            hits,
        };
        debug!(
            catalog = recommendations.catalog_size(),
            returned = recommendations.len(),
            top_k,
            min_similarity,
            "Recommendation complete"
        );
        Ok(recommendations)
    }

    /// Build a document for one recipe and store it unless its key exists.
    pub fn ingest(
        &self,
        recipe_id: &str,
        raw_ingredients: impl Into<IngredientInput>,
        recipe_name: &str,
        extra_fields: Value,
    ) -> Result<IngestOutcome> {
        let deps = self.deps()?;
        let document = DocumentBuilder::new(&deps.provider).build(
            recipe_id,
            raw_ingredients,
            recipe_name,
            extra_fields,
        )?;
        let key = document.storage_key();
        let inserted = deps.store.insert_if_absent(&key, &document)?;
        Ok(IngestOutcome { key, inserted })
    }
}
