//! Default values for configuration

use std::path::PathBuf;

/// Default minimum characters before a clause may close on a blank line
pub fn default_min_clause_chars() -> usize {
    50
}

/// Default number of leading lines scanned for a document title
pub fn default_title_scan_lines() -> usize {
    10
}

/// Default minimum title length
pub fn default_title_min_chars() -> usize {
    10
}

/// Default maximum title length
pub fn default_title_max_chars() -> usize {
    200
}

/// Default: refinement disabled
pub fn default_refinement_enabled() -> bool {
    false
}

/// Default confidence threshold below which refinement is attempted
pub fn default_confidence_threshold() -> f32 {
    0.7
}

/// Default size of the text excerpt sent to the refinement model
pub fn default_excerpt_chars() -> usize {
    6000
}

/// Default refinement request timeout in seconds
pub fn default_refinement_timeout() -> u64 {
    30
}

/// Default refinement endpoint (OpenAI-compatible completions)
pub fn default_refinement_endpoint() -> String {
    "http://127.0.0.1:11434/v1/completions".to_string()
}

/// Default refinement model
pub fn default_refinement_model() -> String {
    "llama3.1:8b".to_string()
}

/// Default maximum characters per chunk
pub fn default_max_chunk_size() -> usize {
    2000
}

/// Default minimum chunk size (smaller fragments are dropped)
pub fn default_min_chunk_size() -> usize {
    50
}

/// Default embedding endpoint
pub fn default_embedding_endpoint() -> String {
    "http://127.0.0.1:8080/embed".to_string()
}

/// Default embedding model (BAAI/bge-small-en-v1.5)
pub fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}

/// Default embedding dimension for bge-small-en-v1.5
pub fn default_embedding_dimension() -> usize {
    384
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default keyword-backend weight in score fusion
pub fn default_keyword_weight() -> f32 {
    0.5
}

/// Default vector-backend weight in score fusion
pub fn default_vector_weight() -> f32 {
    0.5
}

/// Default RRF rank constant
pub fn default_rrf_k() -> f32 {
    60.0
}

/// Default: rerank enabled
pub fn default_rerank_enabled() -> bool {
    true
}

/// Default number of query results
pub fn default_query_k() -> usize {
    10
}

/// Default Qdrant URL for local development
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6333".to_string())
}

/// Default collection name
pub fn default_collection_name() -> String {
    "pactum_chunks".to_string()
}

/// Default SQLite database file for the lifecycle registry
pub fn default_registry_db_file() -> PathBuf {
    PathBuf::from("pactum-registry.db")
}

/// Default expiry reminder offsets in days
pub fn default_reminder_days() -> Vec<i64> {
    vec![90, 60, 30]
}
