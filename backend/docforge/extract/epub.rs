//! EPUB chapter extraction.
//!
//! Walks the spine of an EPUB archive and converts each chapter's XHTML to
//! plain text. Chapter index stands in for the page number downstream.

use std::io::Cursor;

use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

lazy_static! {
    /// Script and style blocks, removed wholesale
    static ref SCRIPT_STYLE_RE: Regex =
        Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
            .expect("Failed to compile SCRIPT_STYLE_RE");

    /// Closing block-level tags, turned into paragraph breaks
    static ref BLOCK_BREAK_RE: Regex =
        Regex::new(r"(?i)</p>|</h[1-6]>|</li>|</div>|</blockquote>|<br\s*/?>")
            .expect("Failed to compile BLOCK_BREAK_RE");

    /// Any remaining markup tag
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").expect("Failed to compile TAG_RE");
}

/// Converts one chapter's XHTML to plain text with paragraph breaks preserved
fn xhtml_to_text(xhtml: &str) -> String {
    let without_scripts = SCRIPT_STYLE_RE.replace_all(xhtml, "");
    let with_breaks = BLOCK_BREAK_RE.replace_all(&without_scripts, "\n\n");
    let stripped = TAG_RE.replace_all(&with_breaks, " ");
    html_escape::decode_html_entities(&stripped).into_owned()
}

/// Extracts chapter texts from an EPUB archive, one string per spine entry.
pub fn extract_chapters(bytes: &[u8]) -> Result<Vec<String>> {
    let mut doc = epub::doc::EpubDoc::from_reader(Cursor::new(bytes.to_vec()))
        .map_err(|e| anyhow!("unreadable EPUB: {}", e))?;

    let chapter_count = doc.get_num_pages();
    let mut chapters = Vec::with_capacity(chapter_count);

    loop {
        let text = match doc.get_current_str() {
            Some((xhtml, _mime)) => xhtml_to_text(&xhtml),
            None => String::new(),
        };
        chapters.push(text);
        if !doc.go_next() {
            break;
        }
    }

    debug!("EPUB extracted: {} chapters", chapters.len());
    Ok(chapters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xhtml_to_text_strips_markup() {
        let xhtml = "<html><body><p>First paragraph.</p><p>Second &amp; final.</p></body></html>";
        let text = xhtml_to_text(xhtml);
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second & final."));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_xhtml_to_text_drops_scripts() {
        let xhtml = "<p>Kept.</p><script>var hidden = 1;</script><style>p { color: red }</style>";
        let text = xhtml_to_text(xhtml);
        assert!(text.contains("Kept."));
        assert!(!text.contains("hidden"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn test_block_tags_become_paragraph_breaks() {
        let xhtml = "<h1>Title</h1><p>Body text here.</p>";
        let text = xhtml_to_text(xhtml);
        let parts: Vec<&str> = text.split("\n\n").map(str::trim).filter(|s| !s.is_empty()).collect();
        assert_eq!(parts, vec!["Title", "Body text here."]);
    }
}
