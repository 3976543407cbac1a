//! Type definitions for paragraph extraction.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// File formats the extractor accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Pdf,
    Epub,
}

impl FileType {
    /// Detect the file type from a filename extension
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_lowercase();
        if lower.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if lower.ends_with(".epub") {
            Some(Self::Epub)
        } else {
            None
        }
    }

    /// Canonical file extension for this type
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Epub => "epub",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Metadata describing one uploaded file
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadedFile {
    /// Server-assigned identifier for the file
    pub file_id: String,
    /// Original filename as supplied by the client
    pub filename: String,
    /// Detected file type
    pub file_type: FileType,
    /// Size of the stored file in bytes
    pub file_size: u64,
}

/// Deterministic flags and measures computed from a paragraph's text
///
/// Every field is a pure function of `text`; re-running extraction on the
/// same input yields byte-identical values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnrichmentMetadata {
    /// Number of sentences, counted by terminal punctuation
    pub sentence_count: usize,
    /// Mean word length in characters
    pub avg_word_length: f64,
    /// Text contains at least one digit
    pub has_numbers: bool,
    /// Text contains characters outside letters, digits, whitespace and
    /// common punctuation
    pub has_special_chars: bool,
    /// First character is uppercase
    pub starts_with_capital: bool,
    /// Last character is terminal or clause punctuation
    pub ends_with_punctuation: bool,
    /// Text ends with a question mark
    pub is_question: bool,
    /// Short, title-case-ish line without terminal punctuation
    pub likely_heading: bool,
    /// Starts with a bullet or a numeric enumerator
    pub likely_list_item: bool,
    /// Text contains a recognizable date
    pub has_dates: bool,
    /// Text contains an email address
    pub has_emails: bool,
    /// Text contains a URL
    pub has_urls: bool,
}

/// One coherent text fragment extracted from an ingested file
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParagraphRecord {
    /// Stable identifier, `<file_id>:p<index>`
    pub id: String,
    /// Owning file's identifier
    pub file_id: String,
    /// 1-based page number (chapter index for EPUB)
    pub page: u32,
    /// 0-based position within the file
    pub paragraph_index: u32,
    /// Whitespace-trimmed paragraph content, never empty
    pub text: String,
    /// Count of whitespace-separated tokens in `text`
    pub word_count: usize,
    /// Count of characters in `text`
    pub char_count: usize,
    /// Deterministic enrichment flags
    #[serde(flatten)]
    pub metadata: EnrichmentMetadata,
    /// Caller-owned opaque annotations; the extractor never writes these
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    #[schema(value_type = Object)]
    pub annotations: Map<String, Value>,
}

/// How the text was obtained from the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// PDF text layer
    PdfText,
    /// EPUB chapter walk
    Epub,
    /// No extractable text layer and no OCR available
    Empty,
}

/// A fully parsed document: header plus ordered paragraph records
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParsedDocument {
    /// Identifier of the source file
    pub file_id: String,
    /// Original filename
    pub filename: String,
    /// Number of pages (PDF) or chapters (EPUB)
    pub total_pages: u32,
    /// How the text was obtained
    pub extraction_method: ExtractionMethod,
    /// Paragraphs ordered by (page, paragraph_index)
    pub paragraphs: Vec<ParagraphRecord>,
}

/// Request body for `POST /api/parse`
#[derive(Debug, Deserialize, ToSchema)]
pub struct ParseRequest {
    /// Identifier returned by the upload endpoint
    pub file_id: String,
}
