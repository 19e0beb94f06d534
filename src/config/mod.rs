//! Configuration management for pactum
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Extraction engine configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// LLM refinement configuration
    #[serde(default)]
    pub refinement: RefinementConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunk: ChunkConfig,

    /// Embedding backend configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Hybrid search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Qdrant connection configuration
    #[serde(default)]
    pub qdrant: QdrantConfig,

    /// Lifecycle registry configuration
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Extraction engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Minimum clause text length before a blank line closes the clause
    #[serde(default = "default_min_clause_chars")]
    pub min_clause_chars: usize,

    /// Number of leading lines scanned for the document title
    #[serde(default = "default_title_scan_lines")]
    pub title_scan_lines: usize,

    /// Minimum acceptable title length
    #[serde(default = "default_title_min_chars")]
    pub title_min_chars: usize,

    /// Maximum acceptable title length
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_clause_chars: default_min_clause_chars(),
            title_scan_lines: default_title_scan_lines(),
            title_min_chars: default_title_min_chars(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

/// LLM refinement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Enable LLM-assisted refinement of low-confidence extractions
    #[serde(default = "default_refinement_enabled")]
    pub enabled: bool,

    /// Confidence below which refinement is attempted
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Maximum characters of document text included in the prompt
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// Request timeout in seconds
    #[serde(default = "default_refinement_timeout")]
    pub timeout_secs: u64,

    /// Completion endpoint URL
    #[serde(default = "default_refinement_endpoint")]
    pub endpoint: String,

    /// Model identifier passed to the endpoint
    #[serde(default = "default_refinement_model")]
    pub model: String,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            enabled: default_refinement_enabled(),
            confidence_threshold: default_confidence_threshold(),
            excerpt_chars: default_excerpt_chars(),
            timeout_secs: default_refinement_timeout(),
            endpoint: default_refinement_endpoint(),
            model: default_refinement_model(),
        }
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Maximum characters per chunk; oversized clauses split recursively
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Minimum chunk size; smaller split fragments are dropped
    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
            min_chunk_size: default_min_chunk_size(),
        }
    }
}

/// Embedding backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding service endpoint
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Model name/identifier
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension (must match model)
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Batch size for embedding
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_embedding_endpoint(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            batch_size: default_embedding_batch_size(),
        }
    }
}

/// Hybrid search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Keyword-backend weight in score fusion (0.0 - 1.0)
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Vector-backend weight in score fusion (0.0 - 1.0)
    #[serde(default = "default_vector_weight")]
    pub vector_weight: f32,

    /// Rank constant K for reciprocal rank fusion
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    /// Enable the post-merge reranker
    #[serde(default = "default_rerank_enabled")]
    pub rerank_enabled: bool,

    /// Default number of results
    #[serde(default = "default_query_k")]
    pub default_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keyword_weight: default_keyword_weight(),
            vector_weight: default_vector_weight(),
            rrf_k: default_rrf_k(),
            rerank_enabled: default_rerank_enabled(),
            default_k: default_query_k(),
        }
    }
}

/// Qdrant connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// Qdrant connection URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Collection name
    #[serde(default = "default_collection_name")]
    pub collection: String,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection_name(),
        }
    }
}

/// Lifecycle registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_registry_db_file")]
    pub db_file: PathBuf,

    /// Expiry reminder offsets in days, largest first
    #[serde(default = "default_reminder_days")]
    pub reminder_days: Vec<i64>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            db_file: default_registry_db_file(),
            reminder_days: default_reminder_days(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.chunk.min_chunk_size >= self.chunk.max_chunk_size {
            return Err(Error::Config(format!(
                "min_chunk_size ({}) must be smaller than max_chunk_size ({})",
                self.chunk.min_chunk_size, self.chunk.max_chunk_size
            )));
        }

        for weight in [self.search.keyword_weight, self.search.vector_weight] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(Error::Config(format!(
                    "Search weights must be in [0, 1], got {}",
                    weight
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.refinement.confidence_threshold) {
            return Err(Error::Config(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.refinement.confidence_threshold
            )));
        }

        if self.embedding.dimension == 0 {
            return Err(Error::Config("Embedding dimension must be non-zero".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk.max_chunk_size, 2000);
        assert_eq!(config.chunk.min_chunk_size, 50);
        assert_eq!(config.search.rrf_k, 60.0);
        assert_eq!(config.registry.reminder_days, vec![90, 60, 30]);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let mut config = Config::default();
        config.search.keyword_weight = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = Config::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pactum.toml");

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();

        assert_eq!(loaded.embedding.dimension, config.embedding.dimension);
        assert_eq!(loaded.qdrant.collection, config.qdrant.collection);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: Config = toml::from_str("[chunk]\nmax_chunk_size = 1000\n").unwrap();
        assert_eq!(parsed.chunk.max_chunk_size, 1000);
        assert_eq!(parsed.chunk.min_chunk_size, 50);
        assert_eq!(parsed.search.default_k, 10);
    }
}
