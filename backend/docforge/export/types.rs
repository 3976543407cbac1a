//! Type definitions for export operations.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Supported export serializations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Jsonl,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Jsonl => "jsonl",
        }
    }
}

/// Request body for `POST /api/export`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExportRequest {
    /// File whose paragraphs are exported
    pub file_id: String,
    /// Target serialization
    pub format: ExportFormat,
    /// Merge caller annotations into the rows
    #[serde(default)]
    pub include_annotations: bool,
    /// Enrich every row with NLP columns
    #[serde(default)]
    pub include_nlp: bool,
}

/// Metadata of a finished export artifact
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExportResult {
    /// Artifact filename inside the exports directory
    pub filename: String,
    /// Number of rows written
    pub record_count: usize,
    /// Path clients download the artifact from
    pub download_url: String,
}

/// Fixed identifying columns, in output order
pub const BASE_COLUMNS: &[&str] = &[
    "file_id",
    "paragraph_id",
    "page",
    "paragraph_index",
    "text",
    "word_count",
    "char_count",
];

/// NLP enrichment columns, in output order
pub const NLP_COLUMNS: &[&str] = &[
    "nlp_entities",
    "nlp_entities_count",
    "nlp_keywords",
    "nlp_sentiment",
    "nlp_sentiment_score",
    "nlp_sentiment_confidence",
];
