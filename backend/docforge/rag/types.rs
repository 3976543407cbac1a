//! Type definitions for the RAG index.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

fn default_top_k() -> usize {
    5
}

/// An indexed paragraph with dataset attribution
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RagDocument {
    /// Paragraph id, unique within the index
    pub id: String,
    /// Owning dataset
    pub dataset_id: String,
    /// Human-readable dataset name
    pub dataset_name: String,
    /// Paragraph text
    pub text: String,
    /// Position of the paragraph within its dataset
    pub row_index: usize,
    /// Copy of the paragraph metadata plus page/index locators
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
}

/// Where the query is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    /// Rank purely by vector similarity over the text
    #[default]
    Text,
    /// Additionally require a query-term hit in the metadata
    Metadata,
    /// Additionally require a query-term hit in text or metadata
    Both,
}

/// Request body for `POST /api/rag/search`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SearchRequest {
    /// Query text
    pub query: String,
    /// Number of results to return
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 100))]
    pub top_k: usize,
    /// Results below this similarity are discarded
    #[serde(default)]
    pub threshold: f32,
    /// Restrict the search to these datasets
    #[serde(default)]
    pub dataset_ids: Option<Vec<String>>,
    /// Match scope
    #[serde(default)]
    pub search_in: SearchScope,
}

/// One ranked search hit
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResult {
    pub document: RagDocument,
    /// Dot product of the normalized query and document vectors
    pub similarity: f32,
    /// Mirrors similarity; reserved for future reranking
    pub relevance_score: f32,
}

/// Request body for `POST /api/rag/context`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ContextRequest {
    /// Query text
    pub query: String,
    /// Number of context items to assemble
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1, max = 100))]
    pub top_k: usize,
    /// Items below this similarity are discarded
    #[serde(default)]
    pub threshold: f32,
    /// Restrict assembly to these datasets
    #[serde(default)]
    pub dataset_ids: Option<Vec<String>>,
}

/// One assembled context item
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ContextItem {
    /// Human-readable locator: dataset name plus paragraph position
    pub source: String,
    /// The paragraph text
    pub content: String,
    pub relevance_score: f32,
    #[schema(value_type = Object)]
    pub metadata: Map<String, Value>,
}

/// Request body for `POST /api/rag/index-dataset-file`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IndexRequest {
    /// Cached parse to index
    pub file_id: String,
    /// Dataset id; defaults to the file_id
    #[serde(default)]
    pub dataset_id: Option<String>,
    /// Dataset display name; defaults to the filename
    #[serde(default)]
    pub dataset_name: Option<String>,
}

/// Response body for `POST /api/rag/index-dataset-file`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IndexResponse {
    /// Number of paragraphs embedded and stored
    pub indexed_documents: usize,
    /// Dataset the documents were filed under
    pub dataset_id: String,
}

/// Aggregate numbers for `GET /api/rag/stats`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RagStats {
    pub total_documents: usize,
    pub total_embeddings: usize,
    pub indexed_datasets: usize,
    pub embedding_dimension: usize,
    /// Whether a real embedding model backs the index
    pub model_available: bool,
}

/// Response body for `GET /api/rag/stats`
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RagStatsResponse {
    pub stats: RagStats,
    /// The known dataset ids, sorted
    pub indexed_datasets: Vec<String>,
}
