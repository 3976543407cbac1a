//! Paragraph splitting and record assembly.
//!
//! Turns per-page (or per-chapter) raw text into ordered `ParagraphRecord`s:
//! hyphenated line-breaks are rejoined, paragraphs are split on blank-line
//! boundaries, internal whitespace is collapsed, and enrichment metadata is
//! computed for every surviving paragraph.

use std::collections::HashMap;

use anyhow::Result;
use lazy_static::lazy_static;
use log::info;
use regex::Regex;

use super::enrich;
use super::types::{ExtractionMethod, FileType, ParagraphRecord, ParsedDocument};
use super::{epub, pdf};

/// Paragraphs shorter than this after trimming are dropped
const MIN_PARAGRAPH_CHARS: usize = 3;

/// A verbatim paragraph repeated on at least this many pages is treated as a
/// running page header
const REPEATED_HEADER_PAGES: usize = 3;

lazy_static! {
    /// Hyphenated line-breaks: `word-\nword`
    static ref HYPHEN_BREAK_RE: Regex =
        Regex::new(r"([A-Za-z])-[ \t]*\r?\n[ \t]*([A-Za-z])")
            .expect("Failed to compile HYPHEN_BREAK_RE");

    /// Blank-line paragraph boundaries
    static ref PARAGRAPH_SPLIT_RE: Regex =
        Regex::new(r"\r?\n[ \t]*\r?\n").expect("Failed to compile PARAGRAPH_SPLIT_RE");
}

/// Splits one page's raw text into candidate paragraphs.
///
/// Hyphenated line-breaks are rejoined first, then the text is split on
/// blank-line boundaries; runs of internal whitespace collapse to single
/// spaces and fragments shorter than three characters are discarded.
pub fn split_paragraphs(raw: &str) -> Vec<String> {
    let rejoined = HYPHEN_BREAK_RE.replace_all(raw, "$1$2");

    PARAGRAPH_SPLIT_RE
        .split(&rejoined)
        .map(|block| block.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .collect()
}

/// Builds paragraph records from per-page texts.
fn assemble_records(file_id: &str, pages: &[String]) -> Vec<ParagraphRecord> {
    // First pass: split every page and count on how many pages each verbatim
    // paragraph occurs, to flag repeated running headers.
    let per_page: Vec<Vec<String>> = pages.iter().map(|p| split_paragraphs(p)).collect();

    let mut pages_seen_on: HashMap<&str, usize> = HashMap::new();
    for page_paragraphs in &per_page {
        let mut seen_this_page: Vec<&str> = Vec::new();
        for text in page_paragraphs {
            if !seen_this_page.contains(&text.as_str()) {
                *pages_seen_on.entry(text.as_str()).or_insert(0) += 1;
                seen_this_page.push(text.as_str());
            }
        }
    }

    let mut records = Vec::new();
    let mut paragraph_index: u32 = 0;

    for (page_idx, page_paragraphs) in per_page.iter().enumerate() {
        for text in page_paragraphs {
            let mut metadata = enrich::enrich(text);
            if pages_seen_on.get(text.as_str()).copied().unwrap_or(0) >= REPEATED_HEADER_PAGES {
                metadata.likely_heading = true;
            }

            records.push(ParagraphRecord {
                id: format!("{}:p{}", file_id, paragraph_index),
                file_id: file_id.to_string(),
                page: (page_idx + 1) as u32,
                paragraph_index,
                word_count: enrich::word_count(text),
                char_count: enrich::char_count(text),
                text: text.clone(),
                metadata,
                annotations: Default::default(),
            });
            paragraph_index += 1;
        }
    }

    records
}

/// Parses raw file bytes into a `ParsedDocument`.
///
/// Unreadable files error; a readable PDF without a text layer yields a
/// degraded result with `extraction_method = "empty"` and zero paragraphs.
pub fn parse_document(
    file_id: &str,
    filename: &str,
    file_type: FileType,
    bytes: &[u8],
) -> Result<ParsedDocument> {
    let (pages, extraction_method) = match file_type {
        FileType::Pdf => {
            let pages = pdf::extract_pages(bytes)?;
            if pdf::is_empty_text_layer(&pages) {
                // No text layer and no OCR backend: degraded, not an error.
                let total_pages = pages.len() as u32;
                info!(
                    "{}: no extractable text layer, returning empty result",
                    file_id
                );
                return Ok(ParsedDocument {
                    file_id: file_id.to_string(),
                    filename: filename.to_string(),
                    total_pages,
                    extraction_method: ExtractionMethod::Empty,
                    paragraphs: Vec::new(),
                });
            }
            (pages, ExtractionMethod::PdfText)
        }
        FileType::Epub => (epub::extract_chapters(bytes)?, ExtractionMethod::Epub),
    };

    let paragraphs = assemble_records(file_id, &pages);
    info!(
        "{}: extracted {} paragraphs from {} pages ({:?})",
        file_id,
        paragraphs.len(),
        pages.len(),
        extraction_method
    );

    Ok(ParsedDocument {
        file_id: file_id.to_string(),
        filename: filename.to_string(),
        total_pages: pages.len() as u32,
        extraction_method,
        paragraphs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_blank_lines() {
        let raw = "First paragraph\nstill first.\n\nSecond paragraph.\n\n\nThird.";
        let paragraphs = split_paragraphs(raw);
        assert_eq!(
            paragraphs,
            vec![
                "First paragraph still first.",
                "Second paragraph.",
                "Third."
            ]
        );
    }

    #[test]
    fn test_short_fragments_dropped() {
        let raw = "ok\n\nlong enough paragraph\n\nab";
        let paragraphs = split_paragraphs(raw);
        assert_eq!(paragraphs, vec!["long enough paragraph"]);
    }

    #[test]
    fn test_hyphenated_line_breaks_rejoined() {
        let raw = "The experi-\nment succeeded beyond expectation.";
        let paragraphs = split_paragraphs(raw);
        assert_eq!(
            paragraphs,
            vec!["The experiment succeeded beyond expectation."]
        );
    }

    #[test]
    fn test_internal_whitespace_collapsed() {
        let raw = "spread    across\t\tthe   line";
        assert_eq!(split_paragraphs(raw), vec!["spread across the line"]);
    }

    #[test]
    fn test_record_ids_and_ordering() {
        let pages = vec![
            "Alpha paragraph.\n\nBeta paragraph.".to_string(),
            "Gamma paragraph.".to_string(),
        ];
        let records = assemble_records("f1", &pages);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].id, "f1:p0");
        assert_eq!(records[2].id, "f1:p2");
        assert_eq!(records[0].page, 1);
        assert_eq!(records[2].page, 2);
        assert_eq!(records[1].paragraph_index, 1);
    }

    #[test]
    fn test_word_and_char_count_invariants() {
        let pages = vec!["Numbers: 1 2 3 and text.".to_string()];
        let records = assemble_records("f1", &pages);
        for r in &records {
            assert_eq!(r.word_count, r.text.split_whitespace().count());
            assert_eq!(r.char_count, r.text.chars().count());
        }
    }

    #[test]
    fn test_repeated_header_flagged() {
        let header = "Annual Report 2023";
        let pages: Vec<String> = (0..3)
            .map(|i| format!("{header}\n\nBody text for page number {i} goes here."))
            .collect();
        let records = assemble_records("f1", &pages);
        let headers: Vec<&ParagraphRecord> =
            records.iter().filter(|r| r.text == header).collect();
        assert_eq!(headers.len(), 3);
        assert!(headers.iter().all(|r| r.metadata.likely_heading));
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let pages = vec!["Some deterministic text.\n\nAnother paragraph.".to_string()];
        let a = assemble_records("f1", &pages);
        let b = assemble_records("f1", &pages);
        let ja = serde_json::to_string(&a).unwrap();
        let jb = serde_json::to_string(&b).unwrap();
        assert_eq!(ja, jb);
    }
}
