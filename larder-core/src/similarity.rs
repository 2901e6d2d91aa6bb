//! Cosine similarity and catalog ranking.
//!
//! Ranking is a pure function over a borrowed catalog: it never mutates entries,
//! never copies embeddings into its output, and keeps no state between calls.
//! Concurrent callers may share the same catalog snapshot freely.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, warn};

use crate::document::RecipeDocument;
use crate::error::{CoreError, Result};

/// One ranked catalog hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimilarityResult<D> {
    /// Reference to the matching catalog entry.
    pub document: D,
    /// Cosine similarity in [-1, 1].
    pub score: f32,
    /// 1-based position in the ranked output.
    pub rank: usize,
}

/// Cosine similarity: `dot(a, b) / (|a| * |b|)`.
///
/// Returns exactly `0.0` when either vector has zero norm. Accumulates in f64,
/// clamps to [-1, 1], and maps any non-finite outcome to `0.0`, so the value is
/// always safe to sort on.
///
/// # Errors
///
/// [`CoreError::DimensionMismatch`] when the lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(CoreError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(cosine_with_norm(a, squared_norm(a).sqrt(), b))
}

fn squared_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum()
}

/// Cosine against a query whose norm is already known. Lengths must match.
fn cosine_with_norm(query: &[f32], query_norm: f64, stored: &[f32]) -> f32 {
    if query_norm == 0.0 {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut stored_sq = 0.0f64;
    for (&q, &s) in query.iter().zip(stored) {
        dot += f64::from(q) * f64::from(s);
        stored_sq += f64::from(s) * f64::from(s);
    }

    let stored_norm = stored_sq.sqrt();
    if stored_norm == 0.0 {
        return 0.0;
    }

    let score = dot / (query_norm * stored_norm);
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0) as f32
}

/// Rank catalog entries against `query`.
///
/// Entries whose embedding is `None` are not indexed yet and are skipped.
/// Entries whose embedding length differs from the query are logged and
/// dropped; the call itself still succeeds. Scores must reach
/// `min_similarity` (inclusive). Output is sorted by score descending; equal
/// scores keep catalog order. At most `top_k` results are returned.
pub fn rank<'a, D, I>(
    query: &[f32],
    catalog: I,
    top_k: usize,
    min_similarity: f32,
) -> Vec<SimilarityResult<&'a D>>
where
    D: ?Sized + 'a,
    I: IntoIterator<Item = (&'a D, Option<&'a [f32]>)>,
{
    if top_k == 0 {
        return Vec::new();
    }

    let query_norm = squared_norm(query).sqrt();
    let mut scanned = 0usize;
    let mut unindexed = 0usize;
    let mut rejected = 0usize;
    let mut hits: Vec<SimilarityResult<&'a D>> = Vec::new();

    for (index, (document, embedding)) in catalog.into_iter().enumerate() {
        scanned += 1;

        let Some(embedding) = embedding else {
            unindexed += 1;
            continue;
        };

        if embedding.len() != query.len() {
            rejected += 1;
            warn!(
                index,
                expected = query.len(),
                actual = embedding.len(),
                "Skipping catalog entry with mismatched embedding dimension"
            );
            continue;
        }

        let score = cosine_with_norm(query, query_norm, embedding);
        if score >= min_similarity {
            hits.push(SimilarityResult {
                document,
                score,
                rank: 0,
            });
        }
    }

    // `sort_by` is stable: ties stay in catalog order.
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    hits.truncate(top_k);
    for (position, hit) in hits.iter_mut().enumerate() {
        hit.rank = position + 1;
    }

    debug!(
        scanned,
        unindexed,
        rejected,
        returned = hits.len(),
        "Ranked catalog"
    );

    hits
}

/// [`rank`] over stored recipe documents.
pub fn rank_documents<'a>(
    query: &[f32],
    catalog: &'a [RecipeDocument],
    top_k: usize,
    min_similarity: f32,
) -> Vec<SimilarityResult<&'a RecipeDocument>> {
    rank(
        query,
        catalog
            .iter()
            .map(|doc| (doc, doc.embedding.as_deref())),
        top_k,
        min_similarity,
    )
}
