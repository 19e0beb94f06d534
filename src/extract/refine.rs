//! LLM-assisted refinement of low-confidence extractions
//!
//! When heuristics leave gaps, a single completion call asks the model for a
//! fixed JSON shape and the result is merged into currently-empty fields
//! only. Every failure mode degrades silently to the heuristic result.

use crate::config::RefinementConfig;
use crate::error::{Error, Result};
use crate::extract::{confidence, dates};
use crate::llm::RefinementClient;
use crate::model::{ExtractedMetadata, Party, PartyRole};
use serde::Deserialize;
use tracing::{debug, warn};

/// JSON shape requested from the model
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefinedMetadata {
    #[serde(default)]
    pub parties: Vec<RefinedParty>,
    #[serde(default)]
    pub governing_law: Option<String>,
    #[serde(default)]
    pub effective_date: Option<String>,
    #[serde(default)]
    pub term_months: Option<u32>,
    #[serde(default)]
    pub is_mutual: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefinedParty {
    pub name: String,
    #[serde(default, rename = "type")]
    pub role: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Whether the heuristic extraction warrants a refinement attempt
pub fn needs_refinement(metadata: &ExtractedMetadata, config: &RefinementConfig) -> bool {
    metadata.confidence_score < config.confidence_threshold
        || metadata.parties.iter().any(|p| p.address.is_none())
        || !metadata.missing_fields.is_empty()
}

/// Run one refinement pass. Merges model output into empty fields and
/// recomputes confidence; any transport or parse failure leaves the
/// heuristic metadata untouched.
pub async fn refine(
    client: &dyn RefinementClient,
    full_text: &str,
    metadata: &mut ExtractedMetadata,
    config: &RefinementConfig,
) {
    let prompt = build_prompt(full_text, metadata, config.excerpt_chars);

    let raw = match client.complete(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Refinement call failed, keeping heuristic extraction: {}", e);
            return;
        }
    };

    let refined = match parse_refined(&raw) {
        Ok(refined) => refined,
        Err(e) => {
            warn!("Refinement response unparseable, keeping heuristic extraction: {}", e);
            return;
        }
    };

    merge(metadata, refined);
    normalize_parties(metadata);
    confidence::score(metadata);
    debug!(
        "Refinement merged; confidence now {:.2}",
        metadata.confidence_score
    );
}

/// Build the schema-constrained prompt with a bounded document excerpt
fn build_prompt(full_text: &str, metadata: &ExtractedMetadata, excerpt_chars: usize) -> String {
    let mut end = excerpt_chars.min(full_text.len());
    while end > 0 && !full_text.is_char_boundary(end) {
        end -= 1;
    }
    let excerpt = &full_text[..end];

    let current = serde_json::json!({
        "parties": metadata.parties.iter().map(|p| serde_json::json!({
            "name": p.name,
            "type": p.role.map(|r| r.to_string()),
            "address": p.address,
        })).collect::<Vec<_>>(),
        "governing_law": metadata.governing_law,
        "effective_date": metadata.effective_date.map(|d| d.to_string()),
        "term_months": metadata.term_months,
        "is_mutual": metadata.is_mutual,
    });

    format!(
        "You are extracting structured metadata from a legal agreement.\n\
         Current extraction (may have missing or null fields):\n{}\n\n\
         Agreement text (excerpt):\n---\n{}\n---\n\n\
         Respond with only a JSON object of this exact shape, using null for \
         unknown values:\n\
         {{\"parties\": [{{\"name\": \"...\", \"type\": \"disclosing|receiving|null\", \
         \"address\": \"...\"}}], \"governing_law\": \"State of ...\", \
         \"effective_date\": \"YYYY-MM-DD\", \"term_months\": 0, \"is_mutual\": true}}",
        current, excerpt
    )
}

/// Parse model output defensively: tolerate prose or code fences around the
/// JSON object.
pub fn parse_refined(raw: &str) -> Result<RefinedMetadata> {
    let start = raw
        .find('{')
        .ok_or_else(|| Error::Refinement("No JSON object in refinement response".into()))?;
    let end = raw
        .rfind('}')
        .ok_or_else(|| Error::Refinement("No JSON object in refinement response".into()))?;
    if end < start {
        return Err(Error::Refinement("Malformed refinement response".into()));
    }

    Ok(serde_json::from_str(&raw[start..=end])?)
}

/// Merge refined fields into currently-empty slots. Parties are wholly
/// replaced when the model returns any.
fn merge(metadata: &mut ExtractedMetadata, refined: RefinedMetadata) {
    if !refined.parties.is_empty() {
        metadata.parties = refined
            .parties
            .into_iter()
            .map(|p| Party {
                name: p.name,
                role: p.role.as_deref().and_then(parse_role),
                address: p.address,
            })
            .collect();
    }

    if metadata.governing_law.is_none() {
        metadata.governing_law = refined.governing_law;
    }
    if metadata.effective_date.is_none() {
        metadata.effective_date = refined
            .effective_date
            .as_deref()
            .and_then(dates::parse_date);
    }
    if metadata.term_months.is_none() {
        metadata.term_months = refined.term_months;
    }
    if metadata.is_mutual.is_none() {
        metadata.is_mutual = refined.is_mutual;
    }
}

fn parse_role(raw: &str) -> Option<PartyRole> {
    match raw.to_lowercase().as_str() {
        "disclosing" => Some(PartyRole::Disclosing),
        "receiving" => Some(PartyRole::Receiving),
        _ => None,
    }
}

/// Collapse whitespace runs in party names and addresses
fn normalize_parties(metadata: &mut ExtractedMetadata) {
    for party in &mut metadata.parties {
        party.name = collapse_whitespace(&party.name);
        if let Some(address) = &party.address {
            party.address = Some(collapse_whitespace(address));
        }
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
