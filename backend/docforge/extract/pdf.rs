//! PDF text-layer extraction.

use anyhow::{anyhow, Result};
use log::{debug, warn};

/// Extracts the text layer of a PDF, one string per page.
///
/// Returns an error only when the file itself is unreadable as a PDF; a
/// readable PDF without an extractable text layer yields pages of empty
/// strings, which the caller reports as a degraded (`empty`) extraction.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<String>> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| anyhow!("unreadable PDF: {}", e))?;

    debug!("PDF text layer extracted: {} pages", pages.len());

    if pages.iter().all(|p| p.trim().is_empty()) {
        warn!("PDF has no extractable text layer");
    }

    Ok(pages)
}

/// Whether an extraction result amounts to no usable text layer
pub fn is_empty_text_layer(pages: &[String]) -> bool {
    pages.iter().all(|p| p.trim().is_empty())
}
