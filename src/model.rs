//! Core data model shared across the extraction, chunking, and retrieval
//! subsystems.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use uuid::Uuid;

/// A single page of source text with its character span in the full text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub page_num: u32,
    pub text: String,
    pub span_start: usize,
    pub span_end: usize,
}

/// Parsed document text as supplied by an external parser/OCR stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSource {
    pub full_text: String,
    pub pages: Vec<Page>,
}

impl TextSource {
    /// Build a single-page source from plain text (useful for tests and
    /// pre-flattened documents).
    pub fn from_text(text: impl Into<String>) -> Self {
        let full_text = text.into();
        let span_end = full_text.len();
        Self {
            pages: vec![Page {
                page_num: 1,
                text: full_text.clone(),
                span_start: 0,
                span_end,
            }],
            full_text,
        }
    }

    /// Resolve the page number containing a character offset.
    /// Falls back to the last page for offsets past the final span.
    pub fn page_at(&self, offset: usize) -> u32 {
        for page in &self.pages {
            if offset >= page.span_start && offset < page.span_end {
                return page.page_num;
            }
        }
        self.pages.last().map(|p| p.page_num).unwrap_or(1)
    }
}

/// Role a party plays in the agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
    Disclosing,
    Receiving,
}

impl std::fmt::Display for PartyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartyRole::Disclosing => write!(f, "disclosing"),
            PartyRole::Receiving => write!(f, "receiving"),
        }
    }
}

/// A contracting party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub role: Option<PartyRole>,
    pub address: Option<String>,
}

impl Party {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: None,
            address: None,
        }
    }
}

/// A numbered or headered contract text unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Clause key as it appears in the document ("3", "3.1", "CONFIDENTIALITY")
    pub number: String,
    pub title: Option<String>,
    pub text: String,
    pub page_num: u32,
    pub span_start: usize,
    pub span_end: usize,
}

/// A "WHEREAS"-style preamble statement, keyed `WHEREAS-N`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recital {
    pub key: String,
    pub text: String,
    pub page_num: u32,
    pub span_start: usize,
    pub span_end: usize,
}

/// Metadata fields tracked by the completeness checklist
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataField {
    Parties,
    PartyAddresses,
    PartyRoles,
    EffectiveDate,
    GoverningLaw,
    TermMonths,
    Mutuality,
}

/// Structured metadata extracted from the agreement text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub parties: Vec<Party>,
    pub governing_law: Option<String>,
    pub effective_date: Option<chrono::NaiveDate>,
    pub term_months: Option<u32>,
    pub survival_months: Option<u32>,
    pub is_mutual: Option<bool>,
    /// Fraction of the completeness checklist satisfied, in [0, 1]
    pub confidence_score: f32,
    pub missing_fields: BTreeSet<MetadataField>,
}

/// Full extraction result for one document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub title: Option<String>,
    pub recitals: Vec<Recital>,
    pub clauses: Vec<Clause>,
    pub metadata: ExtractedMetadata,
}

/// Section a chunk was cut from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionType {
    Title,
    Recital,
    Parties,
    Clause,
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionType::Title => write!(f, "title"),
            SectionType::Recital => write!(f, "recital"),
            SectionType::Parties => write!(f, "parties"),
            SectionType::Clause => write!(f, "clause"),
        }
    }
}

impl FromStr for SectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "title" => Ok(SectionType::Title),
            "recital" => Ok(SectionType::Recital),
            "parties" => Ok(SectionType::Parties),
            "clause" => Ok(SectionType::Clause),
            _ => Err(Error::Other(format!("Unknown section type: {}", s))),
        }
    }
}

/// A provenance-tagged indexable text unit. Immutable once produced;
/// re-ingestion of a document invalidates its entire prior chunk set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable chunk identity, derived from the content hash
    pub chunk_id: Uuid,
    /// Zero-based position within the document's chunk sequence
    pub index: usize,
    pub document_id: String,
    pub section_type: SectionType,
    pub clause_number: Option<String>,
    pub clause_title: Option<String>,
    pub text: String,
    pub page_num: u32,
    pub span_start: usize,
    pub span_end: usize,
    pub source_uri: String,
    /// Blake3 hash of (document_id, index, text)
    pub content_hash: String,
}

impl Chunk {
    /// Compute the stable content hash for a chunk
    pub fn compute_hash(document_id: &str, index: usize, text: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(document_id.as_bytes());
        hasher.update(index.to_le_bytes().as_slice());
        hasher.update(text.as_bytes());
        hasher.finalize().to_hex().to_string()
    }

    /// Derive the stable chunk UUID from a content hash
    pub fn id_from_hash(hash: &str) -> Uuid {
        Uuid::new_v5(&Uuid::NAMESPACE_OID, hash.as_bytes())
    }
}

/// A per-query search result. Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: Uuid,
    pub document_id: String,
    pub text: String,
    pub section_type: SectionType,
    pub clause_number: Option<String>,
    pub page_num: u32,
    pub span_start: usize,
    pub span_end: usize,
    pub source_uri: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_at_resolves_spans() {
        let source = TextSource {
            full_text: "a".repeat(30),
            pages: vec![
                Page {
                    page_num: 1,
                    text: "a".repeat(10),
                    span_start: 0,
                    span_end: 10,
                },
                Page {
                    page_num: 2,
                    text: "a".repeat(20),
                    span_start: 10,
                    span_end: 30,
                },
            ],
        };

        assert_eq!(source.page_at(0), 1);
        assert_eq!(source.page_at(9), 1);
        assert_eq!(source.page_at(10), 2);
        assert_eq!(source.page_at(999), 2); // past the end falls to last page
    }

    #[test]
    fn test_chunk_hash_stability() {
        let h1 = Chunk::compute_hash("doc-1", 0, "text");
        let h2 = Chunk::compute_hash("doc-1", 0, "text");
        let h3 = Chunk::compute_hash("doc-1", 1, "text");

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(Chunk::id_from_hash(&h1), Chunk::id_from_hash(&h2));
    }

    #[test]
    fn test_section_type_roundtrip() {
        assert_eq!(
            "clause".parse::<SectionType>().unwrap(),
            SectionType::Clause
        );
        assert_eq!(SectionType::Parties.to_string(), "parties");
        assert!("bogus".parse::<SectionType>().is_err());
    }
}
