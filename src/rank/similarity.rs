use serde::Serialize;

use crate::embedding::embedder::Embedder;
use crate::error::ServiceError;
use crate::index::{candidate_index::PoolEntry, identity::NodeId};

/// Default number of scene candidates offered to the arbiter.
pub const SCENE_TOP_K: usize = 15;
/// Default number of action candidates offered to the arbiter.
pub const ACTION_TOP_K: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked {
    pub identity: NodeId,
    pub score: f32,
}

/// Cosine similarity; `None` for empty, mismatched or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        None
    } else {
        Some(dot / denom)
    }
}

/// Top `k` of `candidates` by similarity to `query`, best first.
/// Equal scores keep pool order.
pub fn rank_by_vector(query: &[f32], candidates: &[PoolEntry<'_>], k: usize) -> Vec<Ranked> {
    let mut scored: Vec<Ranked> = candidates
        .iter()
        .map(|c| Ranked {
            identity: c.identity.clone(),
            score: cosine_similarity(query, c.vector).unwrap_or(0.0),
        })
        .collect();

    // sort_by is stable, so ties stay in first-seen order
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(k.min(candidates.len()));
    scored
}

/// Ranks a pool against a query text, embedding the query once per call.
pub struct SimilarityRanker<'a> {
    embedder: &'a dyn Embedder,
}

impl<'a> SimilarityRanker<'a> {
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self { embedder }
    }

    pub fn rank(
        &self,
        query_text: &str,
        candidates: &[PoolEntry<'_>],
        k: usize,
    ) -> Result<Vec<Ranked>, ServiceError> {
        if candidates.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed_one(query_text)?;
        check_dimensions(&query, candidates)?;
        Ok(rank_by_vector(&query, candidates, k))
    }
}

/// Fail when candidates carry vectors of another length than the query.
/// Candidates without a vector are left to score zero.
pub fn check_dimensions(query: &[f32], candidates: &[PoolEntry<'_>]) -> Result<(), ServiceError> {
    let mismatched = candidates
        .iter()
        .filter(|c| !c.vector.is_empty() && c.vector.len() != query.len())
        .count();
    if mismatched == 0 {
        return Ok(());
    }
    Err(ServiceError::DimensionMismatch {
        query: query.len(),
        mismatched,
        pool: candidates.len(),
    })
}
