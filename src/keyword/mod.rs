//! In-memory keyword backend
//!
//! BM25 scoring with corpus-level IDF over the indexed chunks. Suitable for
//! a single process; the trait boundary keeps a server-backed lexical index
//! drop-in replaceable.

use crate::error::Result;
use crate::model::{Chunk, SearchHit};
use crate::search::{DocumentAttrs, KeywordBackend, SearchFilter};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

const K1: f32 = 1.2;
const B: f32 = 0.75;

struct IndexedChunk {
    chunk: Chunk,
    term_freqs: HashMap<String, f32>,
    token_len: f32,
}

struct DocEntry {
    chunks: Vec<IndexedChunk>,
    attrs: DocumentAttrs,
}

/// BM25 keyword index held in memory
#[derive(Default)]
pub struct MemoryKeywordBackend {
    docs: RwLock<HashMap<String, DocEntry>>,
}

impl MemoryKeywordBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Lowercased alphanumeric terms, single characters dropped
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|s| s.to_lowercase())
        .filter(|s| s.len() >= 2)
        .collect()
}

fn term_freqs(text: &str) -> (HashMap<String, f32>, f32) {
    let tokens = tokenize(text);
    let len = tokens.len() as f32;
    let mut freqs: HashMap<String, f32> = HashMap::new();
    for token in tokens {
        *freqs.entry(token).or_insert(0.0) += 1.0;
    }
    (freqs, len)
}

fn matches_filter(attrs: &DocumentAttrs, filter: &SearchFilter) -> bool {
    if let Some(party) = &filter.party {
        let needle = party.to_lowercase();
        if !attrs
            .parties
            .iter()
            .any(|p| p.to_lowercase().contains(&needle))
        {
            return false;
        }
    }
    if let Some(law) = &filter.governing_law {
        match &attrs.governing_law {
            Some(have) if have.eq_ignore_ascii_case(law) => {}
            _ => return false,
        }
    }
    if let Some(mutual) = filter.is_mutual {
        if attrs.is_mutual != Some(mutual) {
            return false;
        }
    }
    true
}

#[async_trait]
impl KeywordBackend for MemoryKeywordBackend {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<SearchHit>> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let docs = self.docs.read().await;

        let candidates: Vec<&IndexedChunk> = docs
            .values()
            .filter(|entry| matches_filter(&entry.attrs, filter))
            .flat_map(|entry| entry.chunks.iter())
            .collect();
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let n = candidates.len() as f32;
        let avg_len =
            candidates.iter().map(|c| c.token_len).sum::<f32>() / n;

        // Document frequency per query term, over the filtered corpus
        let mut df: HashMap<&str, f32> = HashMap::new();
        for term in &terms {
            let count = candidates
                .iter()
                .filter(|c| c.term_freqs.contains_key(term))
                .count() as f32;
            df.insert(term.as_str(), count);
        }

        let mut hits: Vec<SearchHit> = Vec::new();
        for candidate in &candidates {
            let mut score = 0.0;
            for term in &terms {
                let tf = match candidate.term_freqs.get(term) {
                    Some(tf) => *tf,
                    None => continue,
                };
                let dfv = df[term.as_str()];
                let idf = (1.0 + (n - dfv + 0.5) / (dfv + 0.5)).ln();
                let denom =
                    tf + K1 * (1.0 - B + B * (candidate.token_len / avg_len.max(1.0)));
                score += idf * tf * (K1 + 1.0) / denom;
            }
            if score > 0.0 {
                let chunk = &candidate.chunk;
                hits.push(SearchHit {
                    chunk_id: chunk.chunk_id,
                    document_id: chunk.document_id.clone(),
                    text: chunk.text.clone(),
                    section_type: chunk.section_type,
                    clause_number: chunk.clause_number.clone(),
                    page_num: chunk.page_num,
                    span_start: chunk.span_start,
                    span_end: chunk.span_end,
                    source_uri: chunk.source_uri.clone(),
                    score,
                });
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn index_chunks(&self, chunks: &[Chunk], attrs: &DocumentAttrs) -> Result<()> {
        let mut docs = self.docs.write().await;

        for chunk in chunks {
            let (freqs, token_len) = term_freqs(&chunk.text);
            docs.entry(chunk.document_id.clone())
                .or_insert_with(|| DocEntry {
                    chunks: Vec::new(),
                    attrs: attrs.clone(),
                })
                .chunks
                .push(IndexedChunk {
                    chunk: chunk.clone(),
                    term_freqs: freqs,
                    token_len,
                });
        }
        Ok(())
    }

    async fn delete_document(&self, document_id: &str) -> Result<u64> {
        let mut docs = self.docs.write().await;
        Ok(docs
            .remove(document_id)
            .map(|entry| entry.chunks.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SectionType;
    use uuid::Uuid;

    fn chunk(id: u128, document_id: &str, text: &str) -> Chunk {
        Chunk {
            chunk_id: Uuid::from_u128(id),
            index: 0,
            document_id: document_id.to_string(),
            section_type: SectionType::Clause,
            clause_number: Some("1".to_string()),
            clause_title: None,
            text: text.to_string(),
            page_num: 1,
            span_start: 0,
            span_end: text.len(),
            source_uri: "file:///nda.pdf".to_string(),
            content_hash: format!("hash-{}", id),
        }
    }

    fn attrs(party: &str, mutual: bool) -> DocumentAttrs {
        DocumentAttrs {
            parties: vec![party.to_string()],
            governing_law: Some("State of Delaware".to_string()),
            is_mutual: Some(mutual),
        }
    }

    #[tokio::test]
    async fn test_bm25_ranks_relevant_text_higher() {
        let backend = MemoryKeywordBackend::new();
        backend
            .index_chunks(
                &[
                    chunk(1, "doc-1", "Confidential Information must be protected."),
                    chunk(2, "doc-1", "This Agreement is governed by Delaware law."),
                ],
                &attrs("Acme Inc.", true),
            )
            .await
            .unwrap();

        let hits = backend
            .search("confidential information", 10, &SearchFilter::default())
            .await
            .unwrap();

        assert_eq!(hits[0].chunk_id, Uuid::from_u128(1));
    }

    #[tokio::test]
    async fn test_rare_terms_outweigh_common_ones() {
        let backend = MemoryKeywordBackend::new();
        // "agreement" is in every chunk; "indemnification" in one
        backend
            .index_chunks(
                &[
                    chunk(1, "doc-1", "agreement term agreement renewal"),
                    chunk(2, "doc-1", "agreement indemnification obligations"),
                    chunk(3, "doc-1", "agreement notices and assignment"),
                ],
                &attrs("Acme Inc.", true),
            )
            .await
            .unwrap();

        let hits = backend
            .search("agreement indemnification", 10, &SearchFilter::default())
            .await
            .unwrap();

        assert_eq!(hits[0].chunk_id, Uuid::from_u128(2));
    }

    #[tokio::test]
    async fn test_filter_restricts_by_party_and_mutuality() {
        let backend = MemoryKeywordBackend::new();
        backend
            .index_chunks(
                &[chunk(1, "doc-1", "confidential information")],
                &attrs("Acme Inc.", true),
            )
            .await
            .unwrap();
        backend
            .index_chunks(
                &[chunk(2, "doc-2", "confidential information")],
                &attrs("Beta Corp", false),
            )
            .await
            .unwrap();

        let filter = SearchFilter {
            party: Some("acme".to_string()),
            ..Default::default()
        };
        let hits = backend.search("confidential", 10, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "doc-1");

        let filter = SearchFilter {
            is_mutual: Some(false),
            ..Default::default()
        };
        let hits = backend.search("confidential", 10, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "doc-2");
    }

    #[tokio::test]
    async fn test_delete_document_counts_removed() {
        let backend = MemoryKeywordBackend::new();
        backend
            .index_chunks(
                &[
                    chunk(1, "doc-1", "first chunk text"),
                    chunk(2, "doc-1", "second chunk text"),
                ],
                &attrs("Acme Inc.", true),
            )
            .await
            .unwrap();

        assert_eq!(backend.delete_document("doc-1").await.unwrap(), 2);
        assert_eq!(backend.delete_document("doc-1").await.unwrap(), 0);

        let hits = backend
            .search("chunk", 10, &SearchFilter::default())
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_yields_nothing() {
        let backend = MemoryKeywordBackend::new();
        backend
            .index_chunks(&[chunk(1, "doc-1", "text")], &attrs("Acme Inc.", true))
            .await
            .unwrap();
        let hits = backend.search("a ?", 10, &SearchFilter::default()).await.unwrap();
        assert!(hits.is_empty());
    }
}
