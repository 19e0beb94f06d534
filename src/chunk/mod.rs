//! Provenance-preserving chunker
//!
//! Turns an extraction into an ordered list of indexable chunks:
//! - Title, recitals, a synthetic parties summary, then clauses
//! - Oversized clauses split on paragraph then sentence boundaries
//! - Character offsets and page numbers survive every split
//!
//! Chunking is deterministic: the same extraction always yields the same
//! chunk sequence, hashes, and ids.

use crate::config::ChunkConfig;
use crate::model::{Chunk, Extraction, SectionType};
use unicode_segmentation::UnicodeSegmentation;

/// Chunk one extraction. Output order and indices are stable.
pub fn chunk_extraction(
    extraction: &Extraction,
    document_id: &str,
    source_uri: &str,
    config: &ChunkConfig,
) -> Vec<Chunk> {
    let mut builder = ChunkBuilder::new(document_id, source_uri);

    if let Some(title) = &extraction.title {
        builder.push(
            SectionType::Title,
            None,
            None,
            title,
            1,
            0,
            title.len(),
        );
    }

    for recital in &extraction.recitals {
        builder.push(
            SectionType::Recital,
            Some(recital.key.clone()),
            None,
            &recital.text,
            recital.page_num,
            recital.span_start,
            recital.span_end,
        );
    }

    let named: Vec<_> = extraction
        .metadata
        .parties
        .iter()
        .filter(|p| !p.name.is_empty())
        .collect();
    if !named.is_empty() {
        let summary = named
            .iter()
            .map(|p| {
                let mut entry = format!("Party: {}", p.name);
                if let Some(role) = p.role {
                    entry.push_str(&format!(" (Type: {})", role));
                }
                if let Some(address) = &p.address {
                    entry.push_str(&format!(" Address: {}", address));
                }
                entry
            })
            .collect::<Vec<_>>()
            .join(" | ");
        // Synthetic text with no source span of its own
        builder.push(SectionType::Parties, None, None, &summary, 1, 0, 0);
    }

    for clause in &extraction.clauses {
        if clause.text.len() <= config.max_chunk_size {
            builder.push(
                SectionType::Clause,
                Some(clause.number.clone()),
                clause.title.clone(),
                &clause.text,
                clause.page_num,
                clause.span_start,
                clause.span_end,
            );
            continue;
        }

        for piece in split_oversized(&clause.text, config) {
            builder.push(
                SectionType::Clause,
                Some(clause.number.clone()),
                clause.title.clone(),
                &clause.text[piece.start..piece.end],
                clause.page_num,
                clause.span_start + piece.start,
                clause.span_start + piece.end,
            );
        }
    }

    builder.finish()
}

/// A byte range within a clause's own text
#[derive(Debug, Clone, Copy)]
struct Piece {
    start: usize,
    end: usize,
}

impl Piece {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Split clause text that exceeds the chunk bound: greedy paragraph packing
/// first, sentence packing for any paragraph still over-bound. Fragments
/// below the minimum are dropped.
fn split_oversized(text: &str, config: &ChunkConfig) -> Vec<Piece> {
    let mut pieces = Vec::new();

    for para in pack_ranges(paragraph_ranges(text), config.max_chunk_size) {
        if para.len() <= config.max_chunk_size {
            pieces.push(para);
            continue;
        }

        let sentences = sentence_ranges(&text[para.start..para.end])
            .into_iter()
            .map(|s| Piece {
                start: para.start + s.start,
                end: para.start + s.end,
            })
            .collect();
        for sent in pack_ranges(sentences, config.max_chunk_size) {
            if sent.len() <= config.max_chunk_size {
                pieces.push(sent);
            } else {
                pieces.extend(hard_split(text, sent, config.max_chunk_size));
            }
        }
    }

    pieces
        .into_iter()
        .filter(|p| text[p.start..p.end].trim().len() >= config.min_chunk_size)
        .collect()
}

/// Blank-line-delimited paragraph spans, whitespace-trimmed at both ends
fn paragraph_ranges(text: &str) -> Vec<Piece> {
    let mut ranges = Vec::new();
    let mut offset = 0;

    for part in text.split("\n\n") {
        let trimmed = part.trim();
        if !trimmed.is_empty() {
            let lead = part.len() - part.trim_start().len();
            let start = offset + lead;
            ranges.push(Piece {
                start,
                end: start + trimmed.len(),
            });
        }
        offset += part.len() + 2;
    }

    ranges
}

/// Unicode sentence-boundary spans within a slice
fn sentence_ranges(text: &str) -> Vec<Piece> {
    text.split_sentence_bound_indices()
        .filter(|(_, s)| !s.trim().is_empty())
        .map(|(i, s)| Piece {
            start: i,
            end: i + s.len(),
        })
        .collect()
}

/// Greedily merge adjacent ranges while the combined span stays within the
/// bound. A single over-bound range passes through for the caller to split
/// further.
fn pack_ranges(ranges: Vec<Piece>, max: usize) -> Vec<Piece> {
    let mut packed: Vec<Piece> = Vec::new();

    for range in ranges {
        match packed.last_mut() {
            Some(last) if range.end - last.start <= max => last.end = range.end,
            _ => packed.push(range),
        }
    }

    packed
}

/// Last resort for a single sentence longer than the bound: cut at char
/// boundaries at the bound.
fn hard_split(text: &str, piece: Piece, max: usize) -> Vec<Piece> {
    let mut out = Vec::new();
    let mut start = piece.start;

    while start < piece.end {
        let mut end = (start + max).min(piece.end);
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            break;
        }
        out.push(Piece { start, end });
        start = end;
    }

    out
}

/// Accumulates chunks with sequential indices and stable identities
struct ChunkBuilder<'a> {
    document_id: &'a str,
    source_uri: &'a str,
    chunks: Vec<Chunk>,
}

impl<'a> ChunkBuilder<'a> {
    fn new(document_id: &'a str, source_uri: &'a str) -> Self {
        Self {
            document_id,
            source_uri,
            chunks: Vec::new(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        &mut self,
        section_type: SectionType,
        clause_number: Option<String>,
        clause_title: Option<String>,
        text: &str,
        page_num: u32,
        span_start: usize,
        span_end: usize,
    ) {
        let index = self.chunks.len();
        let content_hash = Chunk::compute_hash(self.document_id, index, text);
        let chunk_id = Chunk::id_from_hash(&content_hash);

        self.chunks.push(Chunk {
            chunk_id,
            index,
            document_id: self.document_id.to_string(),
            section_type,
            clause_number,
            clause_title,
            text: text.to_string(),
            page_num,
            span_start,
            span_end,
            source_uri: self.source_uri.to_string(),
            content_hash,
        });
    }

    fn finish(self) -> Vec<Chunk> {
        self.chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Clause, ExtractedMetadata, Party, PartyRole, Recital};

    fn clause(number: &str, text: &str, span_start: usize) -> Clause {
        Clause {
            number: number.to_string(),
            title: None,
            text: text.to_string(),
            page_num: 1,
            span_start,
            span_end: span_start + text.len(),
        }
    }

    fn extraction() -> Extraction {
        Extraction {
            title: Some("MUTUAL NON-DISCLOSURE AGREEMENT".to_string()),
            recitals: vec![Recital {
                key: "WHEREAS-1".to_string(),
                text: "WHEREAS, the parties wish to explore a potential business relationship;"
                    .to_string(),
                page_num: 1,
                span_start: 40,
                span_end: 112,
            }],
            clauses: vec![clause(
                "1",
                "1. Definitions. Confidential Information means all nonpublic information.",
                120,
            )],
            metadata: ExtractedMetadata {
                parties: vec![
                    Party {
                        name: "Acme Inc.".to_string(),
                        role: Some(PartyRole::Disclosing),
                        address: Some("1 Main St, Dover, Delaware".to_string()),
                    },
                    Party::named("Beta Corp"),
                ],
                ..Default::default()
            },
        }
    }

    fn config() -> ChunkConfig {
        ChunkConfig {
            max_chunk_size: 2000,
            min_chunk_size: 50,
        }
    }

    #[test]
    fn test_section_ordering() {
        let chunks = chunk_extraction(&extraction(), "doc-1", "file:///nda.pdf", &config());

        let sections: Vec<SectionType> = chunks.iter().map(|c| c.section_type).collect();
        assert_eq!(
            sections,
            vec![
                SectionType::Title,
                SectionType::Recital,
                SectionType::Parties,
                SectionType::Clause,
            ]
        );
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_parties_summary_format() {
        let chunks = chunk_extraction(&extraction(), "doc-1", "file:///nda.pdf", &config());
        let parties = chunks
            .iter()
            .find(|c| c.section_type == SectionType::Parties)
            .unwrap();

        assert_eq!(
            parties.text,
            "Party: Acme Inc. (Type: disclosing) Address: 1 Main St, Dover, Delaware | Party: Beta Corp"
        );
    }

    #[test]
    fn test_no_parties_no_summary_chunk() {
        let mut ex = extraction();
        ex.metadata.parties.clear();
        let chunks = chunk_extraction(&ex, "doc-1", "file:///nda.pdf", &config());
        assert!(chunks
            .iter()
            .all(|c| c.section_type != SectionType::Parties));
    }

    #[test]
    fn test_chunking_is_deterministic() {
        let ex = extraction();
        let a = chunk_extraction(&ex, "doc-1", "file:///nda.pdf", &config());
        let b = chunk_extraction(&ex, "doc-1", "file:///nda.pdf", &config());
        assert_eq!(a, b);
    }

    #[test]
    fn test_oversized_clause_splits_within_bounds() {
        let sentence = "Confidential Information shall be protected with reasonable care. ";
        let body = sentence.repeat(20); // ~1300 chars per paragraph
        let text = format!("{}\n\n{}\n\n{}", body, body, body);
        let span_start = 500;

        let ex = Extraction {
            title: None,
            recitals: Vec::new(),
            clauses: vec![clause("7", &text, span_start)],
            metadata: ExtractedMetadata::default(),
        };
        let cfg = config();
        let chunks = chunk_extraction(&ex, "doc-1", "file:///nda.pdf", &cfg);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.len() <= cfg.max_chunk_size);
            assert!(chunk.text.trim().len() >= cfg.min_chunk_size);
            assert_eq!(chunk.clause_number.as_deref(), Some("7"));
            assert_eq!(chunk.page_num, 1);
            // Offsets stay inside the parent clause span
            assert!(chunk.span_start >= span_start);
            assert!(chunk.span_end <= span_start + text.len());
            // Text matches the claimed span
            assert_eq!(
                chunk.text,
                &text[chunk.span_start - span_start..chunk.span_end - span_start]
            );
        }
    }

    #[test]
    fn test_sentence_packing_for_giant_paragraph() {
        // One paragraph, no blank lines, far over the bound
        let text = "This is a sentence about obligations of the receiving party hereunder. "
            .repeat(60);
        let ex = Extraction {
            title: None,
            recitals: Vec::new(),
            clauses: vec![clause("2", &text, 0)],
            metadata: ExtractedMetadata::default(),
        };
        let cfg = config();
        let chunks = chunk_extraction(&ex, "doc-1", "file:///nda.pdf", &cfg);

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.text.len() <= cfg.max_chunk_size);
        }
    }

    #[test]
    fn test_tiny_split_fragments_dropped() {
        let body = "A substantial paragraph about confidentiality duties that easily clears the minimum chunk size threshold for retention. ".repeat(20);
        let text = format!("{}\n\nShort tail.", body);
        let ex = Extraction {
            title: None,
            recitals: Vec::new(),
            clauses: vec![clause("3", &text, 0)],
            metadata: ExtractedMetadata::default(),
        };
        let chunks = chunk_extraction(&ex, "doc-1", "file:///nda.pdf", &config());

        assert!(chunks.iter().all(|c| c.text != "Short tail."));
    }

    #[test]
    fn test_chunk_ids_distinct_and_stable() {
        let chunks = chunk_extraction(&extraction(), "doc-1", "file:///nda.pdf", &config());
        let mut ids: Vec<_> = chunks.iter().map(|c| c.chunk_id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), chunks.len());

        // Same content under a different document id gets different identities
        let other = chunk_extraction(&extraction(), "doc-2", "file:///nda.pdf", &config());
        assert_ne!(chunks[0].chunk_id, other[0].chunk_id);
    }
}
