//! Document segmentation: title, recitals, and clauses
//!
//! A single line-by-line scan over the full text. Start markers (recital
//! keyword, `N.`/`N.N`/`N.N.N` numbering, or an ALL-CAPS header ending in a
//! colon) open a unit and close the previous one; subsequent non-blank lines
//! append. A unit also closes on a blank line once its text has passed the
//! configured minimum length. Page numbers come from the source's span table.

use crate::config::ExtractionConfig;
use crate::model::{Clause, Recital, TextSource};
use regex::Regex;

/// Keywords that identify an agreement-type title line
const TITLE_KEYWORDS: &[&str] = &[
    "agreement",
    "nda",
    "non-disclosure",
    "nondisclosure",
    "contract",
    "amendment",
    "addendum",
    "memorandum of understanding",
];

/// Small words allowed lowercase inside a title-shaped string
const TITLE_SMALL_WORDS: &[&str] = &["of", "and", "the", "to", "in", "for", "a", "an", "or"];

/// Compiled start-marker patterns, built once per extractor
pub struct SegmentPatterns {
    recital: Regex,
    section_header_only: Regex,
    numbering: Regex,
    caps_header: Regex,
    dotted_title: Regex,
}

impl Default for SegmentPatterns {
    fn default() -> Self {
        Self {
            recital: Regex::new(r"^\s*WHEREAS\b").unwrap(),
            section_header_only: Regex::new(r"^\s*(RECITALS?|WITNESSETH)\s*[:.]?\s*$").unwrap(),
            numbering: Regex::new(r"^\s*(\d+(?:\.\d+){1,2}|\d+\.)\s+").unwrap(),
            caps_header: Regex::new(r"^\s*([A-Z][A-Z0-9 &/\-]{2,60}):\s*").unwrap(),
            dotted_title: Regex::new(r"^(.{2,60}?)\s+\.\s+").unwrap(),
        }
    }
}

/// One unit being accumulated during the scan
struct OpenUnit {
    kind: UnitKind,
    key: String,
    header_title: Option<String>,
    lines: Vec<String>,
    span_start: usize,
    span_end: usize,
}

enum UnitKind {
    Recital,
    Clause,
}

/// Result of segmentation
pub struct Segments {
    pub title: Option<String>,
    pub recitals: Vec<Recital>,
    pub clauses: Vec<Clause>,
}

/// Segment a document into title, recitals, and clauses
pub fn segment(
    source: &TextSource,
    patterns: &SegmentPatterns,
    config: &ExtractionConfig,
) -> Segments {
    let lines = collect_lines(&source.full_text);
    let title = find_title(&lines, config);

    let mut recitals = Vec::new();
    let mut clauses = Vec::new();
    let mut open: Option<OpenUnit> = None;
    let mut recital_count = 0usize;

    for (i, (offset, line)) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            // Blank line closes a unit only once it is long enough
            if let Some(unit) = &open {
                if unit.lines.join("\n").trim().len() > config.min_clause_chars {
                    close_unit(
                        open.take(),
                        &lines,
                        i,
                        patterns,
                        &mut recitals,
                        &mut clauses,
                        source,
                    );
                }
            }
            continue;
        }

        // A bare section header ("RECITALS:") closes the current unit but
        // opens nothing itself
        if patterns.section_header_only.is_match(trimmed) {
            close_unit(
                open.take(),
                &lines,
                i,
                patterns,
                &mut recitals,
                &mut clauses,
                source,
            );
            continue;
        }

        if patterns.recital.is_match(trimmed) {
            close_unit(
                open.take(),
                &lines,
                i,
                patterns,
                &mut recitals,
                &mut clauses,
                source,
            );
            recital_count += 1;
            open = Some(OpenUnit {
                kind: UnitKind::Recital,
                key: format!("WHEREAS-{}", recital_count),
                header_title: None,
                lines: vec![trimmed.to_string()],
                span_start: *offset,
                span_end: offset + line.len(),
            });
            continue;
        }

        if let Some(caps) = patterns.numbering.captures(trimmed) {
            let number = caps[1].trim_end_matches('.').to_string();
            let rest = trimmed[caps.get(0).map(|m| m.end()).unwrap_or(0)..].to_string();
            close_unit(
                open.take(),
                &lines,
                i,
                patterns,
                &mut recitals,
                &mut clauses,
                source,
            );
            open = Some(OpenUnit {
                kind: UnitKind::Clause,
                key: number,
                header_title: None,
                lines: vec![rest],
                span_start: *offset,
                span_end: offset + line.len(),
            });
            continue;
        }

        if let Some(caps) = patterns.caps_header.captures(trimmed) {
            let header = caps[1].trim().to_string();
            let rest = trimmed[caps.get(0).map(|m| m.end()).unwrap_or(0)..].to_string();
            close_unit(
                open.take(),
                &lines,
                i,
                patterns,
                &mut recitals,
                &mut clauses,
                source,
            );
            let mut body = Vec::new();
            if !rest.is_empty() {
                body.push(rest);
            }
            open = Some(OpenUnit {
                kind: UnitKind::Clause,
                key: header.clone(),
                header_title: Some(header),
                lines: body,
                span_start: *offset,
                span_end: offset + line.len(),
            });
            continue;
        }

        // Plain line: append to the open unit, if any
        if let Some(unit) = open.as_mut() {
            unit.lines.push(trimmed.to_string());
            unit.span_end = offset + line.len();
        }
    }

    close_unit(
        open.take(),
        &lines,
        lines.len(),
        patterns,
        &mut recitals,
        &mut clauses,
        source,
    );

    Segments {
        title,
        recitals,
        clauses,
    }
}

/// Collect lines with their character offsets in the full text
fn collect_lines(text: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in text.split('\n') {
        lines.push((offset, line.trim_end_matches('\r')));
        offset += line.len() + 1;
    }
    lines
}

/// Among the first `title_scan_lines` lines, the first line of acceptable
/// length containing an agreement-type keyword
fn find_title(lines: &[(usize, &str)], config: &ExtractionConfig) -> Option<String> {
    for (_, line) in lines.iter().take(config.title_scan_lines) {
        let trimmed = line.trim();
        if trimmed.len() < config.title_min_chars || trimmed.len() > config.title_max_chars {
            continue;
        }
        let lower = trimmed.to_lowercase();
        if TITLE_KEYWORDS.iter().any(|kw| lower.contains(kw)) {
            return Some(trimmed.to_string());
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn close_unit(
    unit: Option<OpenUnit>,
    lines: &[(usize, &str)],
    close_index: usize,
    patterns: &SegmentPatterns,
    recitals: &mut Vec<Recital>,
    clauses: &mut Vec<Clause>,
    source: &TextSource,
) {
    let Some(unit) = unit else { return };
    let text = unit.lines.join("\n").trim().to_string();
    if text.is_empty() && unit.header_title.is_none() {
        return;
    }
    let page_num = source.page_at(unit.span_start);

    match unit.kind {
        UnitKind::Recital => recitals.push(Recital {
            key: unit.key,
            text,
            page_num,
            span_start: unit.span_start,
            span_end: unit.span_end,
        }),
        UnitKind::Clause => {
            let title = unit.header_title.clone().or_else(|| {
                let lookahead = lookahead_lines(lines, close_index);
                extract_clause_title(&text, &lookahead, patterns)
            });
            clauses.push(Clause {
                number: unit.key,
                title,
                text,
                page_num,
                span_start: unit.span_start,
                span_end: unit.span_end,
            });
        }
    }
}

/// Up to 3 lines following the closing position, used to repair
/// single-letter title false positives
fn lookahead_lines<'a>(lines: &[(usize, &'a str)], from: usize) -> Vec<&'a str> {
    lines
        .iter()
        .skip(from)
        .take(3)
        .map(|(_, l)| *l)
        .collect()
}

/// Layered clause-title extraction: "Title . " pattern, else the text before
/// the first period when title-shaped, else a bounded run of leading
/// capitalized words.
pub fn extract_clause_title(
    text: &str,
    lookahead: &[&str],
    patterns: &SegmentPatterns,
) -> Option<String> {
    let first_line = text.lines().next()?.trim();

    let candidate = if let Some(caps) = patterns.dotted_title.captures(first_line) {
        Some(caps[1].trim().to_string())
    } else if let Some(before) = first_line.split('.').next() {
        let before = before.trim();
        if before.len() < first_line.len() && is_title_shaped(before) {
            Some(before.to_string())
        } else {
            leading_capitalized_run(first_line)
        }
    } else {
        leading_capitalized_run(first_line)
    };

    match candidate {
        Some(c) if c.len() == 1 => repair_single_letter(&c, text, lookahead),
        other => other,
    }
}

/// A bounded run (<=5 words, <=50 chars) of leading capitalized words
fn leading_capitalized_run(line: &str) -> Option<String> {
    let mut words = Vec::new();
    for word in line.split_whitespace().take(5) {
        let clean = word.trim_matches(|c: char| !c.is_alphanumeric());
        if clean.chars().next().is_some_and(|c| c.is_uppercase()) {
            words.push(clean.to_string());
            // Sentence punctuation ends the run
            if word.ends_with(['.', ':', ';']) {
                break;
            }
        } else {
            break;
        }
    }

    if words.is_empty() {
        return None;
    }
    let run = words.join(" ");
    if run.len() > 50 {
        return None;
    }
    Some(run)
}

/// Whether a candidate string looks like a section title rather than prose
fn is_title_shaped(s: &str) -> bool {
    if s.len() < 2 || s.len() > 50 {
        return false;
    }
    if !s.chars().next().is_some_and(|c| c.is_uppercase()) {
        return false;
    }
    let words: Vec<&str> = s.split_whitespace().collect();
    if words.len() > 5 {
        return false;
    }
    words.iter().all(|w| {
        let clean = w.trim_matches(|c: char| !c.is_alphanumeric());
        clean.is_empty()
            || clean.chars().next().is_some_and(|c| c.is_uppercase())
            || TITLE_SMALL_WORDS.contains(&clean.to_lowercase().as_str())
    })
}

/// Repair a single-letter title (an artifact of "T. erm"-style OCR splits)
/// by looking ahead up to 3 lines for a capitalized word starting with the
/// same letter.
fn repair_single_letter(letter: &str, text: &str, lookahead: &[&str]) -> Option<String> {
    let first = letter.chars().next()?;
    let candidates = text.lines().skip(1).take(3).chain(lookahead.iter().copied());

    for line in candidates {
        for word in line.split_whitespace() {
            let clean = word.trim_matches(|c: char| !c.is_alphanumeric());
            if clean.len() > 1
                && clean.starts_with(first)
                && clean.chars().next().is_some_and(|c| c.is_uppercase())
            {
                return Some(clean.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::model::TextSource;

    fn run(text: &str) -> Segments {
        let source = TextSource::from_text(text);
        segment(
            &source,
            &SegmentPatterns::default(),
            &ExtractionConfig::default(),
        )
    }

    #[test]
    fn test_title_detection() {
        let segments = run("MUTUAL NON-DISCLOSURE AGREEMENT\n\nThis Agreement is made...");
        assert_eq!(
            segments.title.as_deref(),
            Some("MUTUAL NON-DISCLOSURE AGREEMENT")
        );
    }

    #[test]
    fn test_title_rejects_short_and_missing_keyword_lines() {
        assert!(run("NDA\n\nsome text").title.is_none()); // too short
        assert!(run("A very long heading about nothing relevant\n").title.is_none());
    }

    #[test]
    fn test_numbered_clauses() {
        let text = "1. Definitions. Confidential Information means any data disclosed by either party in any form whatsoever.\n\n2. Term. This Agreement shall remain in effect for a period of three years from the Effective Date hereof.\n";
        let segments = run(text);

        assert_eq!(segments.clauses.len(), 2);
        assert_eq!(segments.clauses[0].number, "1");
        assert_eq!(segments.clauses[0].title.as_deref(), Some("Definitions"));
        assert_eq!(segments.clauses[1].number, "2");
        assert_eq!(segments.clauses[1].title.as_deref(), Some("Term"));
    }

    #[test]
    fn test_nested_numbering() {
        let text = "3.1 Permitted Use. The Receiving Party shall use Confidential Information solely for the Purpose and for no other reason at all.\n";
        let segments = run(text);

        assert_eq!(segments.clauses.len(), 1);
        assert_eq!(segments.clauses[0].number, "3.1");
    }

    #[test]
    fn test_caps_header_clause() {
        let text = "CONFIDENTIALITY:\nEach party agrees to hold all Confidential Information in strict confidence for the full term.\n";
        let segments = run(text);

        assert_eq!(segments.clauses.len(), 1);
        assert_eq!(segments.clauses[0].number, "CONFIDENTIALITY");
        assert_eq!(
            segments.clauses[0].title.as_deref(),
            Some("CONFIDENTIALITY")
        );
    }

    #[test]
    fn test_recitals_keyed_in_order() {
        let text = "RECITALS\n\nWHEREAS, the parties wish to explore a business relationship of mutual interest and benefit;\n\nWHEREAS, in connection with such discussions each party may disclose certain confidential information;\n";
        let segments = run(text);

        assert_eq!(segments.recitals.len(), 2);
        assert_eq!(segments.recitals[0].key, "WHEREAS-1");
        assert_eq!(segments.recitals[1].key, "WHEREAS-2");
        assert!(segments.recitals[0].text.starts_with("WHEREAS"));
    }

    #[test]
    fn test_blank_line_does_not_close_short_unit() {
        // The first paragraph is under the minimum length, so the blank line
        // keeps the clause open and the next paragraph still belongs to it.
        let text = "1. Term. Short.\n\nThe remainder of the clause continues after the break and is appended to the same unit.\n";
        let segments = run(text);

        assert_eq!(segments.clauses.len(), 1);
        assert!(segments.clauses[0].text.contains("remainder"));
    }

    #[test]
    fn test_marker_closes_previous_unit() {
        let text = "1. First clause body that is comfortably longer than the minimum clause threshold for closing.\n2. Second clause body, also long enough to stand on its own as an extracted unit of text.\n";
        let segments = run(text);

        assert_eq!(segments.clauses.len(), 2);
        assert!(segments.clauses[0].text.starts_with("First"));
        assert!(segments.clauses[1].text.starts_with("Second"));
    }

    #[test]
    fn test_spans_and_pages() {
        let text = "1. First clause body long enough to close when the blank line arrives right after this sentence.\n\n2. Second clause.\n";
        let source = TextSource::from_text(text);
        let segments = segment(
            &source,
            &SegmentPatterns::default(),
            &ExtractionConfig::default(),
        );

        let first = &segments.clauses[0];
        assert_eq!(first.span_start, 0);
        assert!(first.span_end <= text.len());
        assert_eq!(first.page_num, 1);
    }

    #[test]
    fn test_clause_title_bounded_run() {
        let title = extract_clause_title(
            "Return Obligations All documents shall be returned promptly",
            &[],
            &SegmentPatterns::default(),
        );
        assert_eq!(title.as_deref(), Some("Return Obligations All"));
    }

    #[test]
    fn test_clause_title_dotted_pattern() {
        let title = extract_clause_title(
            "Term . This Agreement lasts three years",
            &[],
            &SegmentPatterns::default(),
        );
        assert_eq!(title.as_deref(), Some("Term"));
    }

    #[test]
    fn test_single_letter_repair() {
        let title = extract_clause_title(
            "T.\nTermination of this Agreement requires notice",
            &[],
            &SegmentPatterns::default(),
        );
        assert_eq!(title.as_deref(), Some("Termination"));
    }

    #[test]
    fn test_prose_first_line_yields_no_title() {
        let title = extract_clause_title(
            "each party shall keep the information secret",
            &[],
            &SegmentPatterns::default(),
        );
        assert!(title.is_none());
    }
}
