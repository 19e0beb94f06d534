//! Structured-field extraction engine
//!
//! Turns raw agreement text plus a page map into a title, recitals, clauses,
//! and structured metadata with a completeness-based confidence score. The
//! engine is pure pattern matching; an optional LLM refinement pass fills
//! gaps and always degrades to the heuristic result on failure.

pub mod confidence;
pub mod dates;
mod fields;
mod refine;
mod segment;

pub use fields::FieldPatterns;
pub use refine::{needs_refinement, parse_refined, RefinedMetadata, RefinedParty};
pub use segment::{SegmentPatterns, Segments};

use crate::config::{ExtractionConfig, RefinementConfig};
use crate::error::{Error, Result};
use crate::llm::RefinementClient;
use crate::model::{Extraction, TextSource};
use std::sync::Arc;
use tracing::debug;

/// Extraction engine. Stateless apart from compiled patterns; safe to share
/// across documents and tasks.
pub struct Extractor {
    config: ExtractionConfig,
    refinement: RefinementConfig,
    segment_patterns: SegmentPatterns,
    field_patterns: FieldPatterns,
    refiner: Option<Arc<dyn RefinementClient>>,
}

impl Extractor {
    pub fn new(config: ExtractionConfig, refinement: RefinementConfig) -> Self {
        Self {
            config,
            refinement,
            segment_patterns: SegmentPatterns::default(),
            field_patterns: FieldPatterns::default(),
            refiner: None,
        }
    }

    /// Attach a refinement client. Refinement still only runs when enabled
    /// in the configuration and the heuristic extraction has gaps.
    pub fn with_refiner(mut self, client: Arc<dyn RefinementClient>) -> Self {
        self.refiner = Some(client);
        self
    }

    /// Extract title, recitals, clauses, and metadata from a document
    pub async fn extract(&self, source: &TextSource) -> Result<Extraction> {
        validate_page_map(source)?;

        let segments = segment::segment(source, &self.segment_patterns, &self.config);
        let mut metadata = fields::resolve_metadata(&source.full_text, &self.field_patterns);
        confidence::score(&mut metadata);

        debug!(
            "Extracted {} recitals, {} clauses, confidence {:.2}",
            segments.recitals.len(),
            segments.clauses.len(),
            metadata.confidence_score
        );

        if self.refinement.enabled {
            if let Some(refiner) = &self.refiner {
                if refine::needs_refinement(&metadata, &self.refinement) {
                    refine::refine(
                        refiner.as_ref(),
                        &source.full_text,
                        &mut metadata,
                        &self.refinement,
                    )
                    .await;
                }
            }
        }

        Ok(Extraction {
            title: segments.title,
            recitals: segments.recitals,
            clauses: segments.clauses,
            metadata,
        })
    }
}

/// An unusable page/span table is a hard failure: offsets derived from it
/// would mislabel every chunk's provenance.
fn validate_page_map(source: &TextSource) -> Result<()> {
    if source.pages.is_empty() {
        return Err(Error::InvalidPageMap("Page table is empty".into()));
    }

    let mut prev_end = 0usize;
    for page in &source.pages {
        if page.span_start > page.span_end {
            return Err(Error::InvalidPageMap(format!(
                "Page {} has inverted span {}..{}",
                page.page_num, page.span_start, page.span_end
            )));
        }
        if page.span_start < prev_end {
            return Err(Error::InvalidPageMap(format!(
                "Page {} span overlaps its predecessor",
                page.page_num
            )));
        }
        if page.span_end > source.full_text.len() {
            return Err(Error::InvalidPageMap(format!(
                "Page {} span {}..{} exceeds text length {}",
                page.page_num,
                page.span_start,
                page.span_end,
                source.full_text.len()
            )));
        }
        prev_end = page.span_end;
    }

    Ok(())
}
