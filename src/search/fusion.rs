//! Score fusion and reranking
//!
//! Backend score scales are not comparable (BM25 is unbounded, cosine
//! similarity is not), so each backend's list is normalized to [0, 1] by its
//! own maximum before a weighted merge keyed by chunk id. A pluggable
//! reranker then reorders the union; the default uses reciprocal rank
//! fusion over the original backend rankings.

use crate::error::Result;
use crate::model::SearchHit;
use std::collections::HashMap;
use uuid::Uuid;

/// One backend's ranked output plus its fusion weight
pub struct RankedList {
    pub hits: Vec<SearchHit>,
    pub weight: f32,
}

/// Scale scores so the best hit in the list scores 1.0. An empty list or an
/// all-zero list is left untouched.
pub fn normalize_scores(hits: &mut [SearchHit]) {
    let max = hits.iter().map(|h| h.score).fold(0.0f32, f32::max);
    if max > 0.0 {
        for hit in hits.iter_mut() {
            hit.score /= max;
        }
    }
}

/// Merge normalized backend lists into a union keyed by chunk id, summing
/// weighted scores for chunks that appear in more than one list.
pub fn weighted_merge(lists: &[RankedList]) -> Vec<SearchHit> {
    let mut merged: HashMap<Uuid, SearchHit> = HashMap::new();

    for list in lists {
        for hit in &list.hits {
            let weighted = hit.score * list.weight;
            merged
                .entry(hit.chunk_id)
                .and_modify(|existing| existing.score += weighted)
                .or_insert_with(|| {
                    let mut hit = hit.clone();
                    hit.score = weighted;
                    hit
                });
        }
    }

    merged.into_values().collect()
}

/// Reorders the merged union. Implementations must not drop hits.
pub trait Reranker: Send + Sync {
    fn rerank(&self, lists: &[RankedList], merged: Vec<SearchHit>) -> Result<Vec<SearchHit>>;
}

/// Reciprocal rank fusion: each hit scores `sum(weight / (K + rank))` over
/// the backend lists that contain it, with 1-based ranks. Chunks surfaced by
/// both backends dominate chunks surfaced by one.
pub struct RrfReranker {
    pub k: f32,
}

impl Default for RrfReranker {
    fn default() -> Self {
        Self { k: 60.0 }
    }
}

impl Reranker for RrfReranker {
    fn rerank(&self, lists: &[RankedList], merged: Vec<SearchHit>) -> Result<Vec<SearchHit>> {
        let mut rrf: HashMap<Uuid, f32> = HashMap::new();
        for list in lists {
            for (rank, hit) in list.hits.iter().enumerate() {
                *rrf.entry(hit.chunk_id).or_insert(0.0) +=
                    list.weight / (self.k + (rank + 1) as f32);
            }
        }

        let mut reranked = merged;
        for hit in &mut reranked {
            hit.score = rrf.get(&hit.chunk_id).copied().unwrap_or(0.0);
        }
        Ok(reranked)
    }
}

/// Keeps the weighted-merge scores as-is
pub struct IdentityReranker;

impl Reranker for IdentityReranker {
    fn rerank(&self, _lists: &[RankedList], merged: Vec<SearchHit>) -> Result<Vec<SearchHit>> {
        Ok(merged)
    }
}
