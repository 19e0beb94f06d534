//! Per-document ingestion pipeline
//!
//! extract → chunk → invalidate prior chunks → embed → index. The pipeline
//! holds no per-document state, so one instance can serve a worker pool
//! ingesting many documents concurrently.

use crate::chunk;
use crate::config::{ChunkConfig, EmbeddingConfig};
use crate::embed::{embed_in_batches, Embedder};
use crate::error::Result;
use crate::extract::Extractor;
use crate::model::TextSource;
use crate::search::{DocumentAttrs, KeywordBackend, VectorBackend};
use std::sync::Arc;
use tracing::info;

/// Outcome of ingesting one document
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: String,
    pub title: Option<String>,
    pub chunks_indexed: usize,
    pub chunks_deleted: u64,
    pub confidence_score: f32,
}

/// One-document-at-a-time ingestion over the shared backends
pub struct IngestPipeline {
    extractor: Arc<Extractor>,
    chunk_config: ChunkConfig,
    embedding_config: EmbeddingConfig,
    embedder: Arc<dyn Embedder>,
    keyword: Arc<dyn KeywordBackend>,
    vector: Arc<dyn VectorBackend>,
}

impl IngestPipeline {
    pub fn new(
        extractor: Arc<Extractor>,
        chunk_config: ChunkConfig,
        embedding_config: EmbeddingConfig,
        embedder: Arc<dyn Embedder>,
        keyword: Arc<dyn KeywordBackend>,
        vector: Arc<dyn VectorBackend>,
    ) -> Self {
        Self {
            extractor,
            chunk_config,
            embedding_config,
            embedder,
            keyword,
            vector,
        }
    }

    /// Ingest one document end to end. Prior chunks for the document are
    /// invalidated on both backends before the new set is indexed.
    pub async fn ingest(
        &self,
        source: &TextSource,
        document_id: &str,
        source_uri: &str,
    ) -> Result<IngestReport> {
        let extraction = self.extractor.extract(source).await?;
        let chunks = chunk::chunk_extraction(&extraction, document_id, source_uri, &self.chunk_config);

        let attrs = DocumentAttrs {
            parties: extraction
                .metadata
                .parties
                .iter()
                .map(|p| p.name.clone())
                .collect(),
            governing_law: extraction.metadata.governing_law.clone(),
            is_mutual: extraction.metadata.is_mutual,
        };

        let (deleted_keyword, deleted_vector) = tokio::join!(
            self.keyword.delete_document(document_id),
            self.vector.delete_document(document_id),
        );
        let chunks_deleted = deleted_keyword?.max(deleted_vector?);

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_in_batches(
            self.embedder.as_ref(),
            texts,
            self.embedding_config.batch_size,
        )
        .await?;

        self.keyword.index_chunks(&chunks, &attrs).await?;
        self.vector.index_chunks(&chunks, vectors, &attrs).await?;

        info!(
            "Ingested {}: {} chunks indexed, {} prior chunks removed",
            document_id,
            chunks.len(),
            chunks_deleted
        );

        Ok(IngestReport {
            document_id: document_id.to_string(),
            title: extraction.title.clone(),
            chunks_indexed: chunks.len(),
            chunks_deleted,
            confidence_score: extraction.metadata.confidence_score,
        })
    }
}
