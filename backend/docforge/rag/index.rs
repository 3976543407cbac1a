//! The per-paragraph vector index.
//!
//! Documents live in an ordered list, embeddings in a map keyed by document
//! id, and dataset membership in a sorted set. Mutations take the exclusive
//! lock; searches take the shared lock and see a consistent snapshot. The
//! whole index serializes to a single JSON blob that is reloaded on startup
//! and flushed after every mutation and on shutdown.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use log::{info, warn};
use ndarray::ArrayView1;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::embedder::{embed_cached, Embedder};
use super::types::{
    ContextItem, ContextRequest, RagDocument, RagStats, SearchRequest, SearchResult, SearchScope,
};
use crate::config::Config;
use crate::docforge::extract::types::{ParagraphRecord, ParsedDocument};

/// Documents are embedded and inserted in chunks of this size, yielding the
/// scheduler between chunks
pub const INDEX_CHUNK_SIZE: usize = 2000;

/// The in-memory vector store
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RagIndex {
    documents: Vec<RagDocument>,
    embeddings: FxHashMap<String, Vec<f32>>,
    indexed_datasets: BTreeSet<String>,
}

static INDEX: LazyLock<RwLock<RagIndex>> = LazyLock::new(|| RwLock::new(RagIndex::default()));

/// Derives the document category from the enrichment flags
fn categorize(paragraph: &ParagraphRecord) -> &'static str {
    if paragraph.metadata.likely_heading {
        "heading"
    } else if paragraph.metadata.is_question {
        "question"
    } else if paragraph.metadata.likely_list_item {
        "list_item"
    } else {
        "content"
    }
}

/// Projects one paragraph into a RAG document under a dataset
pub fn paragraph_to_document(
    paragraph: &ParagraphRecord,
    dataset_id: &str,
    dataset_name: &str,
) -> RagDocument {
    let mut metadata = match serde_json::to_value(&paragraph.metadata) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    metadata.insert("page".into(), json!(paragraph.page));
    metadata.insert("paragraph_index".into(), json!(paragraph.paragraph_index));
    metadata.insert("word_count".into(), json!(paragraph.word_count));
    metadata.insert("category".into(), json!(categorize(paragraph)));
    metadata.insert(
        "intent".into(),
        json!(if paragraph.metadata.is_question {
            "question"
        } else {
            "statement"
        }),
    );

    RagDocument {
        id: paragraph.id.clone(),
        dataset_id: dataset_id.to_string(),
        dataset_name: dataset_name.to_string(),
        text: paragraph.text.clone(),
        row_index: paragraph.paragraph_index as usize,
        metadata,
    }
}

impl RagIndex {
    /// Inserts prepared (document, vector) pairs, replacing documents that
    /// share an id with an earlier indexing run
    pub fn insert_prepared(
        &mut self,
        prepared: Vec<(RagDocument, Vec<f32>)>,
        dataset_id: &str,
    ) -> usize {
        let mut inserted = 0usize;
        for (document, vector) in prepared {
            if let Some(existing) = self.documents.iter().position(|d| d.id == document.id) {
                self.documents.remove(existing);
            }
            self.embeddings.insert(document.id.clone(), vector);
            self.documents.push(document);
            inserted += 1;
        }
        if inserted > 0 {
            self.indexed_datasets.insert(dataset_id.to_string());
        }
        inserted
    }

    /// Indexes every paragraph of a parsed document synchronously.
    ///
    /// A per-document embedding failure skips that document and logs; it
    /// never aborts the batch.
    pub fn index_parsed(
        &mut self,
        parsed: &ParsedDocument,
        dataset_id: &str,
        dataset_name: &str,
        embedder: &Embedder,
    ) -> usize {
        let prepared: Vec<(RagDocument, Vec<f32>)> = parsed
            .paragraphs
            .iter()
            .filter_map(|paragraph| {
                let vector =
                    catch_unwind(AssertUnwindSafe(|| embed_cached(embedder, &paragraph.text)));
                match vector {
                    Ok(vector) => Some((
                        paragraph_to_document(paragraph, dataset_id, dataset_name),
                        vector,
                    )),
                    Err(_) => {
                        warn!("embedding failed for {}; document skipped", paragraph.id);
                        None
                    }
                }
            })
            .collect();
        self.insert_prepared(prepared, dataset_id)
    }

    /// Whether a document passes the scope restriction for this query
    fn scope_matches(document: &RagDocument, scope: SearchScope, query_terms: &[String]) -> bool {
        match scope {
            SearchScope::Text => true,
            SearchScope::Metadata | SearchScope::Both => {
                if query_terms.is_empty() {
                    return true;
                }
                let metadata = serde_json::to_string(&document.metadata)
                    .unwrap_or_default()
                    .to_lowercase();
                let text_hit = scope == SearchScope::Both
                    && query_terms
                        .iter()
                        .any(|t| document.text.to_lowercase().contains(t));
                text_hit || query_terms.iter().any(|t| metadata.contains(t))
            }
        }
    }

    /// Vector search: similarity = dot product of normalized vectors,
    /// threshold filter, deterministic ordering by (similarity desc,
    /// dataset_id, document id)
    pub fn search(&self, request: &SearchRequest, embedder: &Embedder) -> Vec<SearchResult> {
        if self.documents.is_empty() {
            return Vec::new();
        }

        let query_vector = embed_cached(embedder, &request.query);
        let query = ArrayView1::from(query_vector.as_slice());
        let query_terms: Vec<String> = request
            .query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        let mut hits: Vec<(&RagDocument, f32)> = Vec::new();
        for document in &self.documents {
            if let Some(dataset_ids) = &request.dataset_ids {
                if !dataset_ids.contains(&document.dataset_id) {
                    continue;
                }
            }
            if !Self::scope_matches(document, request.search_in, &query_terms) {
                continue;
            }
            let Some(vector) = self.embeddings.get(&document.id) else {
                continue;
            };
            if vector.len() != query_vector.len() {
                continue;
            }
            let similarity = query.dot(&ArrayView1::from(vector.as_slice()));
            if similarity < request.threshold {
                continue;
            }
            hits.push((document, similarity));
        }

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.dataset_id.cmp(&b.0.dataset_id))
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        hits.into_iter()
            .take(request.top_k)
            .map(|(document, similarity)| SearchResult {
                document: document.clone(),
                similarity,
                relevance_score: similarity,
            })
            .collect()
    }

    /// Ranked context assembly over the same search pipeline
    pub fn build_context(&self, request: &ContextRequest, embedder: &Embedder) -> Vec<ContextItem> {
        let search_request = SearchRequest {
            query: request.query.clone(),
            top_k: request.top_k,
            threshold: request.threshold,
            dataset_ids: request.dataset_ids.clone(),
            search_in: SearchScope::Text,
        };

        self.search(&search_request, embedder)
            .into_iter()
            .map(|hit| {
                let page = hit.document.metadata.get("page").and_then(Value::as_u64);
                let source = match page {
                    Some(page) => format!(
                        "{} · p{}¶{}",
                        hit.document.dataset_name, page, hit.document.row_index
                    ),
                    None => format!("{} · ¶{}", hit.document.dataset_name, hit.document.row_index),
                };
                ContextItem {
                    source,
                    content: hit.document.text,
                    relevance_score: hit.relevance_score,
                    metadata: hit.document.metadata,
                }
            })
            .collect()
    }

    /// Removes every document of a dataset; returns how many were dropped
    pub fn remove_dataset(&mut self, dataset_id: &str) -> usize {
        let before = self.documents.len();
        self.documents.retain(|document| {
            if document.dataset_id == dataset_id {
                self.embeddings.remove(&document.id);
                false
            } else {
                true
            }
        });
        self.indexed_datasets.remove(dataset_id);
        before - self.documents.len()
    }

    /// Aggregate numbers for the stats endpoint
    pub fn stats(&self, embedder: &Embedder) -> RagStats {
        RagStats {
            total_documents: self.documents.len(),
            total_embeddings: self.embeddings.len(),
            indexed_datasets: self.indexed_datasets.len(),
            embedding_dimension: embedder.dimension(),
            model_available: embedder.model_available(),
        }
    }

    /// The known dataset ids, sorted
    pub fn dataset_ids(&self) -> Vec<String> {
        self.indexed_datasets.iter().cloned().collect()
    }

    /// Loads an index blob, treating a corrupt or missing file as empty
    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(index) => index,
                Err(e) => {
                    warn!(
                        "Corrupt RAG index at {} ({}); starting empty",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Serializes the index atomically, skipping (with a warning) blobs
    /// above the size ceiling rather than truncating data
    pub fn flush(&self, path: &Path, max_bytes: usize) -> Result<()> {
        let payload = serde_json::to_vec(self).context("Failed to serialize RAG index")?;
        if payload.len() > max_bytes {
            warn!(
                "RAG index is {} bytes, above the {} byte persistence ceiling; skipping flush",
                payload.len(),
                max_bytes
            );
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create RAG storage directory")?;
        }
        let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        std::fs::write(&tmp, &payload).context("Failed to write RAG index temp file")?;
        std::fs::rename(&tmp, path).context("Failed to move RAG index into place")?;
        Ok(())
    }
}

/// Loads the persisted index into the process-wide singleton
pub async fn initialize() {
    let path = PathBuf::from(&Config::global().rag_index_path);
    let loaded = RagIndex::load(&path);
    let documents = loaded.documents.len();
    *INDEX.write().await = loaded;
    info!(
        "RAG index initialized: {} documents from {}",
        documents,
        path.display()
    );
}

/// Flushes the singleton to disk
pub async fn flush_global() {
    let config = Config::global();
    let index = INDEX.read().await;
    if let Err(e) = index.flush(
        Path::new(&config.rag_index_path),
        config.rag_max_persist_bytes,
    ) {
        warn!("Failed to persist RAG index: {}", e);
    }
}

/// Flush on shutdown
pub async fn shutdown() {
    info!("Flushing RAG index before shutdown");
    flush_global().await;
}

/// Indexes a parsed document into the singleton, yielding between chunks to
/// keep the host responsive; flushes when done
pub async fn index_into_global(
    parsed: &ParsedDocument,
    dataset_id: &str,
    dataset_name: &str,
) -> usize {
    let embedder = Embedder::global();
    let total_chunks = parsed.paragraphs.chunks(INDEX_CHUNK_SIZE).count();
    let mut indexed = 0usize;

    for (chunk_number, chunk) in parsed.paragraphs.chunks(INDEX_CHUNK_SIZE).enumerate() {
        // Embeddings are computed outside the lock.
        let prepared: Vec<(RagDocument, Vec<f32>)> = chunk
            .iter()
            .filter_map(|paragraph| {
                match catch_unwind(AssertUnwindSafe(|| embed_cached(embedder, &paragraph.text))) {
                    Ok(vector) => Some((
                        paragraph_to_document(paragraph, dataset_id, dataset_name),
                        vector,
                    )),
                    Err(_) => {
                        warn!("embedding failed for {}; document skipped", paragraph.id);
                        None
                    }
                }
            })
            .collect();

        {
            let mut index = INDEX.write().await;
            indexed += index.insert_prepared(prepared, dataset_id);
        }
        info!(
            "Indexing {}: chunk {}/{} done ({} documents)",
            dataset_id,
            chunk_number + 1,
            total_chunks,
            indexed
        );
        tokio::task::yield_now().await;
    }

    flush_global().await;
    indexed
}

/// Runs a closure under the shared lock
pub async fn with_index<T>(f: impl FnOnce(&RagIndex) -> T) -> T {
    let index = INDEX.read().await;
    f(&index)
}

/// Removes a dataset from the singleton and re-flushes
pub async fn remove_dataset_global(dataset_id: &str) -> usize {
    let removed = {
        let mut index = INDEX.write().await;
        index.remove_dataset(dataset_id)
    };
    flush_global().await;
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docforge::extract::enrich;
    use crate::docforge::extract::types::ExtractionMethod;
    use crate::docforge::rag::embedder::HashEmbedder;

    fn paragraph(file_id: &str, index: u32, text: &str) -> ParagraphRecord {
        ParagraphRecord {
            id: format!("{}:p{}", file_id, index),
            file_id: file_id.to_string(),
            page: 1,
            paragraph_index: index,
            word_count: enrich::word_count(text),
            char_count: enrich::char_count(text),
            metadata: enrich::enrich(text),
            text: text.to_string(),
            annotations: Default::default(),
        }
    }

    fn parsed(file_id: &str, texts: &[&str]) -> ParsedDocument {
        ParsedDocument {
            file_id: file_id.to_string(),
            filename: format!("{}.pdf", file_id),
            total_pages: 1,
            extraction_method: ExtractionMethod::PdfText,
            paragraphs: texts
                .iter()
                .enumerate()
                .map(|(i, t)| paragraph(file_id, i as u32, t))
                .collect(),
        }
    }

    fn embedder() -> Embedder {
        Embedder::Hash(HashEmbedder::new(384))
    }

    fn search_request(query: &str, top_k: usize, threshold: f32) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            top_k,
            threshold,
            dataset_ids: None,
            search_in: SearchScope::Text,
        }
    }

    #[test]
    fn test_indexing_populates_all_structures() {
        let mut index = RagIndex::default();
        let doc = parsed("f1", &["First paragraph text.", "Second paragraph text."]);
        let count = index.index_parsed(&doc, "ds1", "Dataset One", &embedder());

        assert_eq!(count, 2);
        assert_eq!(index.documents.len(), 2);
        assert_eq!(index.embeddings.len(), 2);
        assert!(index.indexed_datasets.contains("ds1"));
    }

    #[test]
    fn test_stored_vectors_are_normalized() {
        let mut index = RagIndex::default();
        let doc = parsed("f1", &["Some text to embed for the norm check."]);
        index.index_parsed(&doc, "ds1", "Dataset One", &embedder());

        for vector in index.embeddings.values() {
            let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_search_finds_indexed_sentence() {
        let mut index = RagIndex::default();
        let sentence = "iPhone 15 was announced in September 2023";
        let doc = parsed("f1", &[sentence]);
        index.index_parsed(&doc, "ds1", "Product News", &embedder());

        let results = index.search(&search_request(sentence, 5, 0.0), &embedder());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.text, sentence);
        assert!(results[0].similarity > 0.0);
        assert_eq!(results[0].relevance_score, results[0].similarity);
    }

    #[test]
    fn test_search_on_empty_corpus_returns_empty() {
        let index = RagIndex::default();
        let results = index.search(&search_request("anything", 5, 0.0), &embedder());
        assert!(results.is_empty());
    }

    #[test]
    fn test_results_sorted_desc_with_deterministic_ties() {
        let mut index = RagIndex::default();
        let text = "identical paragraph text for the tie";
        index.index_parsed(&parsed("b", &[text]), "ds-b", "B", &embedder());
        index.index_parsed(&parsed("a", &[text]), "ds-a", "A", &embedder());

        let results = index.search(&search_request(text, 10, -1.0), &embedder());
        assert_eq!(results.len(), 2);
        // Same similarity: dataset_id breaks the tie lexicographically.
        assert_eq!(results[0].document.dataset_id, "ds-a");
        assert_eq!(results[1].document.dataset_id, "ds-b");
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn test_threshold_equals_post_filtering() {
        let mut index = RagIndex::default();
        index.index_parsed(
            &parsed(
                "f1",
                &["alpha text body", "beta text body", "gamma text body"],
            ),
            "ds1",
            "D",
            &embedder(),
        );

        let unfiltered = index.search(&search_request("alpha text body", 10, -1.0), &embedder());
        let threshold = 0.05f32;
        let filtered = index.search(
            &search_request("alpha text body", 10, threshold),
            &embedder(),
        );

        let expected: Vec<&str> = unfiltered
            .iter()
            .filter(|r| r.similarity >= threshold)
            .map(|r| r.document.id.as_str())
            .collect();
        let actual: Vec<&str> = filtered.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_dataset_filter_restricts_results() {
        let mut index = RagIndex::default();
        let text = "shared corpus sentence";
        index.index_parsed(&parsed("a", &[text]), "ds-a", "A", &embedder());
        index.index_parsed(&parsed("b", &[text]), "ds-b", "B", &embedder());

        let mut request = search_request(text, 10, -1.0);
        request.dataset_ids = Some(vec!["ds-b".to_string()]);
        let results = index.search(&request, &embedder());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.dataset_id, "ds-b");
    }

    #[test]
    fn test_remove_dataset_drops_everything() {
        let mut index = RagIndex::default();
        let text = "to be removed";
        index.index_parsed(&parsed("a", &[text]), "ds-a", "A", &embedder());
        index.index_parsed(&parsed("b", &[text]), "ds-b", "B", &embedder());

        let removed = index.remove_dataset("ds-a");
        assert_eq!(removed, 1);
        assert_eq!(index.documents.len(), 1);
        assert_eq!(index.embeddings.len(), 1);
        assert!(!index.indexed_datasets.contains("ds-a"));

        let results = index.search(&search_request(text, 10, -1.0), &embedder());
        assert!(results.iter().all(|r| r.document.dataset_id == "ds-b"));
    }

    #[test]
    fn test_reindexing_replaces_documents() {
        let mut index = RagIndex::default();
        index.index_parsed(&parsed("f1", &["original text"]), "ds1", "D", &embedder());
        index.index_parsed(&parsed("f1", &["original text"]), "ds1", "D", &embedder());
        assert_eq!(index.documents.len(), 1);
        assert_eq!(index.embeddings.len(), 1);
    }

    #[test]
    fn test_category_derivation() {
        let mut index = RagIndex::default();
        let doc = parsed(
            "f1",
            &[
                "Chapter Overview",
                "Is this the right approach?",
                "- bullet entry text",
                "Plain body content sentence.",
            ],
        );
        index.index_parsed(&doc, "ds1", "D", &embedder());

        let categories: Vec<&str> = index
            .documents
            .iter()
            .map(|d| d.metadata["category"].as_str().unwrap())
            .collect();
        assert_eq!(categories, vec!["heading", "question", "list_item", "content"]);
    }

    #[test]
    fn test_context_assembly_carries_source_and_metadata() {
        let mut index = RagIndex::default();
        let sentence = "The quarterly report shows growth.";
        index.index_parsed(&parsed("f1", &[sentence]), "ds1", "Reports", &embedder());

        let request = ContextRequest {
            query: sentence.to_string(),
            top_k: 5,
            threshold: 0.0,
            dataset_ids: None,
        };
        let context = index.build_context(&request, &embedder());
        assert_eq!(context.len(), 1);
        assert!(context[0].source.contains("Reports"));
        assert_eq!(context[0].content, sentence);
        assert!(context[0].metadata.contains_key("category"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let dir = std::env::temp_dir().join(format!("docforge-rag-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rag_index.json");

        let mut index = RagIndex::default();
        index.index_parsed(
            &parsed("f1", &["persisted paragraph one", "persisted paragraph two"]),
            "ds1",
            "D",
            &embedder(),
        );
        index.flush(&path, usize::MAX).unwrap();

        let reloaded = RagIndex::load(&path);
        assert_eq!(reloaded.documents.len(), 2);
        assert_eq!(reloaded.embeddings.len(), 2);
        assert!(reloaded.indexed_datasets.contains("ds1"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let dir = std::env::temp_dir().join(format!("docforge-rag-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rag_index.json");
        std::fs::write(&path, b"{ definitely not an index").unwrap();

        let index = RagIndex::load(&path);
        assert!(index.documents.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_oversized_flush_is_skipped() {
        let dir = std::env::temp_dir().join(format!("docforge-rag-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rag_index.json");

        let mut index = RagIndex::default();
        index.index_parsed(&parsed("f1", &["some indexed text"]), "ds1", "D", &embedder());
        index.flush(&path, 8).unwrap();

        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
