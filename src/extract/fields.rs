//! Metadata field resolution
//!
//! Each field is resolved independently by an ordered rule list: patterns
//! are tried in sequence and the first (or best-qualifying) match wins,
//! followed by field-specific cleanup. Rule lists live in `FieldPatterns`
//! so new document shapes are additive rather than new branches.

use crate::extract::dates::parse_date;
use crate::model::{ExtractedMetadata, Party, PartyRole};
use chrono::NaiveDate;
use regex::Regex;

/// Spelled-out numbers accepted in term/survival phrases
const SPELLED_NUMBERS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("twelve", 12),
    ("eighteen", 18),
    ("twenty-four", 24),
    ("twenty four", 24),
    ("thirty-six", 36),
    ("thirty six", 36),
    ("forty-eight", 48),
    ("forty eight", 48),
    ("sixty", 60),
];

/// Term/survival bounds in months
const TERM_MIN_MONTHS: u32 = 12;
const TERM_MAX_MONTHS: u32 = 120;
/// Preferred band when several candidates qualify
const TERM_COMMON_RANGE: std::ops::RangeInclusive<u32> = 24..=36;

/// Compiled field-resolution rule lists
pub struct FieldPatterns {
    disclosing_label: Regex,
    receiving_label: Regex,
    between: Regex,
    entity_suffix: Regex,
    address: Regex,
    mutual: Regex,
    unilateral: Regex,
    governing_law: Vec<Regex>,
    law_qualifier: Regex,
    term: Vec<Regex>,
    survival: Vec<Regex>,
    date_anchor: Regex,
    date_long_form: Regex,
    date_numeric: Regex,
}

/// Capture for a US state/commonwealth name: 1-3 capitalized words
const STATE: &str = r"([A-Z][A-Za-z]+(?: [A-Z][A-Za-z]+){0,2})";

impl Default for FieldPatterns {
    fn default() -> Self {
        let month = "January|February|March|April|May|June|July|August|September|October|November|December";
        let duration = r"([A-Za-z]+(?:[- ][A-Za-z]+)?|\d+)\s*(?:\((\d+)\))?\s*(years?|months?)";

        Self {
            disclosing_label: Regex::new(r"(?im)^\s*Disclosing Party\s*:\s*(.+)$").unwrap(),
            receiving_label: Regex::new(r"(?im)^\s*Receiving Party\s*:\s*(.+)$").unwrap(),
            between: Regex::new(r"(?i)\bbetween\s+(.+?)\s+and\s+([^,;(\n]+?)(?:[,;(\n]|\.\s|\.?\s*$)")
                .unwrap(),
            entity_suffix: Regex::new(
                r"\b([A-Z][A-Za-z0-9&'. -]{0,60}?(?:Inc\.?|LLC|L\.L\.C\.|Ltd\.?|Corp\.?|Corporation|Company|GmbH|PLC))",
            )
            .unwrap(),
            address: Regex::new(
                r"(?i)(?:located at|with offices at|whose address is|having its principal place of business at|with its principal place of business at)\s+([^;\n]+?)(?:\s*[.;(]|$)",
            )
            .unwrap(),
            mutual: Regex::new(r"(?i)\bmutual(?:ly)?\b").unwrap(),
            unilateral: Regex::new(r"(?i)\b(?:unilateral|one[- ]way)\b").unwrap(),
            governing_law: vec![
                Regex::new(&format!(r"(?i:governed by(?: and construed in accordance with)? the laws? of (?:the )?(?:state|commonwealth) of ){STATE}")).unwrap(),
                Regex::new(&format!(r"(?i:laws? of the (?:state|commonwealth) of ){STATE}")).unwrap(),
                Regex::new(&format!(r"(?i:jurisdiction of(?: the courts of)? (?:the )?state of ){STATE}")).unwrap(),
                Regex::new(&format!(r"(?i:applicable law[^.\n]{{0,40}}?state of ){STATE}")).unwrap(),
            ],
            law_qualifier: Regex::new(r"(?i)\s*(?:,|without|excluding|notwithstanding|and\b).*$").unwrap(),
            term: vec![
                Regex::new(&format!(r"(?i)(?:term of|for a period of|period of)\s+{duration}")).unwrap(),
                Regex::new(&format!(r"(?i)\bremain in (?:full force and )?effect for\s+{duration}")).unwrap(),
                Regex::new(&format!(r"(?i)\b{duration}\b")).unwrap(),
            ],
            survival: vec![
                Regex::new(&format!(r"(?i)survive[^.\n]{{0,80}}?for(?: a period of)?\s+{duration}")).unwrap(),
                Regex::new(&format!(r"(?i)survival period of\s+{duration}")).unwrap(),
            ],
            date_anchor: Regex::new(
                r"(?i)(?:effective (?:as of|date[: ]?)|dated(?: as of)?|entered into (?:as of|on)|made (?:as of|on))\s*(?:the\s+)?([^\n;]{4,60})",
            )
            .unwrap(),
            date_long_form: Regex::new(&format!(
                r"(?:the\s+)?(?:\d{{1,2}}(?:st|nd|rd|th)?\s+day\s+of\s+)?(?:{month})\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}|\d{{1,2}}(?:st|nd|rd|th)?\s+day\s+of\s+(?:{month}),?\s+\d{{4}}"
            ))
            .unwrap(),
            date_numeric: Regex::new(r"\b(\d{1,2}/\d{1,2}/\d{2,4}|\d{4}-\d{2}-\d{2}|\d{1,2}-\d{1,2}-\d{4})\b").unwrap(),
        }
    }
}

/// Resolve all metadata fields from the document text. Confidence scoring is
/// applied separately by the caller.
pub fn resolve_metadata(text: &str, patterns: &FieldPatterns) -> ExtractedMetadata {
    ExtractedMetadata {
        parties: resolve_parties(text, patterns),
        governing_law: resolve_governing_law(text, patterns),
        effective_date: resolve_effective_date(text, patterns),
        term_months: resolve_months(text, &patterns.term),
        survival_months: resolve_months(text, &patterns.survival),
        is_mutual: resolve_mutuality(text, patterns),
        ..Default::default()
    }
}

// ===== Parties =====

fn resolve_parties(text: &str, patterns: &FieldPatterns) -> Vec<Party> {
    let mut parties = labeled_parties(text, patterns);

    if parties.is_empty() {
        parties = between_parties(text, patterns);
    }
    if parties.is_empty() {
        parties = suffix_parties(text, patterns);
    }

    dedup_by_name(&mut parties);

    for party in &mut parties {
        if party.role.is_none() {
            party.role = infer_role(text, &party.name);
        }
        if party.address.is_none() {
            party.address = find_address(text, &party.name, patterns);
        }
    }

    parties
}

fn labeled_parties(text: &str, patterns: &FieldPatterns) -> Vec<Party> {
    let mut parties = Vec::new();

    for caps in patterns.disclosing_label.captures_iter(text) {
        if let Some(name) = clean_party_name(&caps[1]) {
            parties.push(Party {
                name,
                role: Some(PartyRole::Disclosing),
                address: None,
            });
        }
    }
    for caps in patterns.receiving_label.captures_iter(text) {
        if let Some(name) = clean_party_name(&caps[1]) {
            parties.push(Party {
                name,
                role: Some(PartyRole::Receiving),
                address: None,
            });
        }
    }

    parties
}

fn between_parties(text: &str, patterns: &FieldPatterns) -> Vec<Party> {
    let Some(caps) = patterns.between.captures(text) else {
        return Vec::new();
    };

    [&caps[1], &caps[2]]
        .iter()
        .filter_map(|raw| clean_party_name(raw))
        .map(Party::named)
        .collect()
}

fn suffix_parties(text: &str, patterns: &FieldPatterns) -> Vec<Party> {
    patterns
        .entity_suffix
        .captures_iter(text)
        .take(4)
        .filter_map(|caps| clean_party_name(&caps[1]))
        .map(Party::named)
        .collect()
}

/// Strip legal boilerplate around a party name; None when the remainder does
/// not look like a name.
fn clean_party_name(raw: &str) -> Option<String> {
    let mut name = raw.trim();

    // Cut corporate descriptors: "Acme Inc., a Delaware corporation"
    for sep in [", a ", ", an ", ", the ", " (", ","] {
        if let Some(idx) = name.find(sep) {
            name = &name[..idx];
        }
    }
    // Cut at a sentence break, keeping a suffix period ("Acme Inc. The ...")
    if let Some(idx) = name.find(". ") {
        name = &name[..idx + 1];
    }

    let name = name
        .trim()
        .trim_matches('"')
        .trim_end_matches([';', ':'])
        .trim();

    if name.len() < 2 || name.len() > 100 {
        return None;
    }
    if !name.chars().next().is_some_and(|c| c.is_uppercase()) {
        return None;
    }
    Some(name.to_string())
}

fn dedup_by_name(parties: &mut Vec<Party>) {
    let mut seen = std::collections::HashSet::new();
    parties.retain(|p| seen.insert(p.name.clone()));
}

/// Clamp an offset down to the nearest UTF-8 character boundary
fn floor_char_boundary(text: &str, mut pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    while pos > 0 && !text.is_char_boundary(pos) {
        pos -= 1;
    }
    pos
}

/// Infer a party's role from the text surrounding its name
fn infer_role(text: &str, name: &str) -> Option<PartyRole> {
    let idx = text.find(name)?;
    let window_start = floor_char_boundary(text, idx.saturating_sub(120));
    let window_end = floor_char_boundary(text, idx + name.len() + 120);
    let window = text[window_start..window_end].to_lowercase();

    if window.contains("disclos") {
        Some(PartyRole::Disclosing)
    } else if window.contains("recipient") || window.contains("receiv") {
        Some(PartyRole::Receiving)
    } else {
        None
    }
}

fn find_address(text: &str, name: &str, patterns: &FieldPatterns) -> Option<String> {
    let idx = text.find(name)?;
    let window_end = floor_char_boundary(text, idx + name.len() + 200);
    let window = &text[idx..window_end];

    patterns
        .address
        .captures(window)
        .map(|caps| caps[1].trim().to_string())
}

// ===== Mutuality =====

fn resolve_mutuality(text: &str, patterns: &FieldPatterns) -> Option<bool> {
    if patterns.mutual.is_match(text) {
        Some(true)
    } else if patterns.unilateral.is_match(text) {
        Some(false)
    } else {
        None
    }
}

// ===== Governing law =====

fn resolve_governing_law(text: &str, patterns: &FieldPatterns) -> Option<String> {
    for rule in &patterns.governing_law {
        if let Some(caps) = rule.captures(text) {
            let raw = caps[1].trim();
            let stripped = patterns.law_qualifier.replace(raw, "");
            let name = stripped.trim();
            if !name.is_empty() {
                return Some(format!("State of {}", title_case(name)));
            }
        }
    }
    None
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ===== Term / survival months =====

/// Collect qualifying candidates from the rule list in order; prefer one in
/// the common 24-36 month range, else the first.
fn resolve_months(text: &str, rules: &[Regex]) -> Option<u32> {
    let mut candidates = Vec::new();

    for rule in rules {
        for caps in rule.captures_iter(text) {
            let word = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let paren = caps.get(2).and_then(|m| m.as_str().parse::<u32>().ok());
            let unit = caps.get(3).map(|m| m.as_str()).unwrap_or_default();

            let Some(count) = paren.or_else(|| parse_count(word)) else {
                continue;
            };
            let months = if unit.to_lowercase().starts_with("year") {
                count.saturating_mul(12)
            } else {
                count
            };
            if (TERM_MIN_MONTHS..=TERM_MAX_MONTHS).contains(&months) {
                candidates.push(months);
            }
        }
        if !candidates.is_empty() {
            break;
        }
    }

    candidates
        .iter()
        .copied()
        .find(|m| TERM_COMMON_RANGE.contains(m))
        .or_else(|| candidates.first().copied())
}

fn parse_count(word: &str) -> Option<u32> {
    if let Ok(n) = word.parse::<u32>() {
        return Some(n);
    }
    let lower = word.to_lowercase();
    SPELLED_NUMBERS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, n)| *n)
}

// ===== Effective date =====

fn resolve_effective_date(text: &str, patterns: &FieldPatterns) -> Option<NaiveDate> {
    // Rule 1: a date-shaped substring inside an anchor-phrase window
    for caps in patterns.date_anchor.captures_iter(text) {
        let window = &caps[1];
        if let Some(date) = first_date_in(window, patterns) {
            return Some(date);
        }
    }

    // Rule 2: bare numeric date anywhere
    for m in patterns.date_numeric.find_iter(text) {
        if let Some(date) = parse_date(m.as_str()) {
            return Some(date);
        }
    }

    // Rule 3: long-form month-name date anywhere
    for m in patterns.date_long_form.find_iter(text) {
        if let Some(date) = parse_date(m.as_str()) {
            return Some(date);
        }
    }

    None
}

fn first_date_in(window: &str, patterns: &FieldPatterns) -> Option<NaiveDate> {
    if let Some(m) = patterns.date_long_form.find(window) {
        if let Some(date) = parse_date(m.as_str()) {
            return Some(date);
        }
    }
    if let Some(m) = patterns.date_numeric.find(window) {
        if let Some(date) = parse_date(m.as_str()) {
            return Some(date);
        }
    }
    None
}
