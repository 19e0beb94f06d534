//! pactum - contract intelligence for legal agreements
//!
//! This crate provides:
//! - Structured-field extraction from agreement text (parties, dates,
//!   governing law, term, mutuality) with confidence scoring and optional
//!   LLM refinement
//! - A provenance-preserving chunker feeding keyword and vector indexes
//! - Hybrid retrieval with score fusion and reciprocal rank fusion
//! - A lifecycle registry that tracks agreement state and schedules
//!   deduplicated expiry notifications

pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod extract;
pub mod keyword;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod search;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use extract::Extractor;
pub use model::{Chunk, Extraction, ExtractedMetadata, SearchHit, TextSource};
pub use pipeline::{IngestPipeline, IngestReport};
pub use registry::{Registry, RegistryRecord, UpsertFields};
pub use search::HybridSearcher;
