//! Completion client used for LLM-assisted extraction refinement

mod http_backend;

pub use http_backend::*;

use crate::error::Result;
use async_trait::async_trait;

/// Capability interface for a text-completion model. The extraction engine
/// only ever sends one prompt per document and treats any failure as
/// non-fatal.
#[async_trait]
pub trait RefinementClient: Send + Sync {
    /// Complete a prompt and return the raw model output
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging
    fn model_name(&self) -> &str;
}
