//! Hybrid retrieval over keyword and vector backends
//!
//! A query runs against both backends concurrently. Scores are normalized
//! per backend, merged by weight, reranked, and truncated. One backend
//! going down degrades the query to the survivor; the query only fails when
//! both are unavailable.

pub mod fusion;

pub use fusion::{IdentityReranker, RankedList, Reranker, RrfReranker};

use crate::config::SearchConfig;
use crate::embed::Embedder;
use crate::error::{Error, Result};
use crate::model::{Chunk, SearchHit};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Metadata predicate applied by both backends
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// Match documents with this party name
    pub party: Option<String>,
    pub governing_law: Option<String>,
    pub is_mutual: Option<bool>,
}

impl SearchFilter {
    pub fn is_empty(&self) -> bool {
        self.party.is_none() && self.governing_law.is_none() && self.is_mutual.is_none()
    }
}

/// Document-level attributes indexed alongside chunks for filtering
#[derive(Debug, Clone, Default)]
pub struct DocumentAttrs {
    pub parties: Vec<String>,
    pub governing_law: Option<String>,
    pub is_mutual: Option<bool>,
}

/// Keyword (lexical) search backend
#[async_trait]
pub trait KeywordBackend: Send + Sync {
    async fn search(&self, query: &str, k: usize, filter: &SearchFilter)
        -> Result<Vec<SearchHit>>;

    async fn index_chunks(&self, chunks: &[Chunk], attrs: &DocumentAttrs) -> Result<()>;

    /// Remove every chunk of a document; returns the number removed
    async fn delete_document(&self, document_id: &str) -> Result<u64>;
}

/// Vector (semantic) search backend
#[async_trait]
pub trait VectorBackend: Send + Sync {
    async fn search(&self, vector: Vec<f32>, k: usize, filter: &SearchFilter)
        -> Result<Vec<SearchHit>>;

    async fn index_chunks(
        &self,
        chunks: &[Chunk],
        vectors: Vec<Vec<f32>>,
        attrs: &DocumentAttrs,
    ) -> Result<()>;

    /// Remove every chunk of a document; returns the number removed
    async fn delete_document(&self, document_id: &str) -> Result<u64>;
}

/// Fused retrieval across one keyword and one vector backend
pub struct HybridSearcher {
    keyword: Arc<dyn KeywordBackend>,
    vector: Arc<dyn VectorBackend>,
    embedder: Arc<dyn Embedder>,
    reranker: Box<dyn Reranker>,
    config: SearchConfig,
}

impl HybridSearcher {
    pub fn new(
        keyword: Arc<dyn KeywordBackend>,
        vector: Arc<dyn VectorBackend>,
        embedder: Arc<dyn Embedder>,
        config: SearchConfig,
    ) -> Self {
        let reranker: Box<dyn Reranker> = if config.rerank_enabled {
            Box::new(RrfReranker { k: config.rrf_k })
        } else {
            Box::new(IdentityReranker)
        };
        Self {
            keyword,
            vector,
            embedder,
            reranker,
            config,
        }
    }

    /// Replace the reranker
    pub fn with_reranker(mut self, reranker: Box<dyn Reranker>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Run a hybrid query. Read-only; issues both backend calls
    /// concurrently.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        let (keyword_result, vector_result) = tokio::join!(
            self.keyword.search(query, k, filter),
            self.vector_search(query, k, filter),
        );

        let (keyword_hits, vector_hits) = match (keyword_result, vector_result) {
            (Ok(kw), Ok(vec)) => (kw, vec),
            (Ok(kw), Err(e)) => {
                warn!("Vector backend unavailable, keyword-only results: {}", e);
                (kw, Vec::new())
            }
            (Err(e), Ok(vec)) => {
                warn!("Keyword backend unavailable, vector-only results: {}", e);
                (Vec::new(), vec)
            }
            (Err(kw_err), Err(vec_err)) => {
                return Err(Error::Search(format!(
                    "Both backends failed: keyword: {}; vector: {}",
                    kw_err, vec_err
                )));
            }
        };

        debug!(
            "Query matched {} keyword hits, {} vector hits",
            keyword_hits.len(),
            vector_hits.len()
        );

        let mut lists = vec![
            RankedList {
                hits: keyword_hits,
                weight: self.config.keyword_weight,
            },
            RankedList {
                hits: vector_hits,
                weight: self.config.vector_weight,
            },
        ];
        for list in &mut lists {
            fusion::normalize_scores(&mut list.hits);
        }

        let merged = fusion::weighted_merge(&lists);
        let mut hits = match self.reranker.rerank(&lists, merged.clone()) {
            Ok(reranked) => reranked,
            Err(e) => {
                warn!("Reranker failed, keeping fused order: {}", e);
                merged
            }
        };

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });

        let mut seen = HashSet::new();
        hits.retain(|h| seen.insert(h.chunk_id));
        hits.truncate(k);
        Ok(hits)
    }

    async fn vector_search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        let mut vectors = self.embedder.embed(vec![query.to_string()]).await?;
        let vector = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("Embedder returned no vector for query".into()))?;
        self.vector.search(vector, k, filter).await
    }
}
