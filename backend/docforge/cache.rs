//! Parsed-result cache.
//!
//! File-level key-value store keyed by `file_id`: one JSON blob per parsed
//! file under the cache directory, fronted by an in-memory map. Writes are
//! atomic (temp file in the same directory, then rename); corrupt blobs are
//! logged and treated as a miss. The cache is advisory: the canonical
//! source is the original upload, and the directory may be cleared at any
//! time.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use dashmap::DashMap;
use log::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::docforge::extract::types::ParsedDocument;

/// In-memory read-through layer over the on-disk blobs
static MEMORY_CACHE: LazyLock<DashMap<String, Arc<ParsedDocument>>> = LazyLock::new(DashMap::new);

/// On-disk location of one file's parsed blob
fn blob_path(dir: &Path, file_id: &str) -> PathBuf {
    dir.join(format!("{}_parsed.json", file_id))
}

/// Writes a parsed document blob atomically into `dir`
async fn write_blob(dir: &Path, file_id: &str, document: &ParsedDocument) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .context("Failed to create cache directory")?;

    let payload = serde_json::to_vec(document).context("Failed to serialize parsed document")?;

    // Write-temp-then-rename keeps readers from ever observing a partial blob.
    let tmp = dir.join(format!(".{}_parsed.json.tmp-{}", file_id, Uuid::new_v4()));
    tokio::fs::write(&tmp, &payload)
        .await
        .context("Failed to write cache temp file")?;
    tokio::fs::rename(&tmp, blob_path(dir, file_id))
        .await
        .context("Failed to move cache blob into place")?;

    Ok(())
}

/// Reads a parsed document blob from `dir`, treating corruption as a miss
async fn read_blob(dir: &Path, file_id: &str) -> Option<ParsedDocument> {
    let path = blob_path(dir, file_id);
    let contents = tokio::fs::read(&path).await.ok()?;

    match serde_json::from_slice::<ParsedDocument>(&contents) {
        Ok(document) => Some(document),
        Err(e) => {
            warn!(
                "Corrupt cache blob for {} at {}: {} (treating as miss)",
                file_id,
                path.display(),
                e
            );
            None
        }
    }
}

/// Stores a parsed document under its `file_id`
pub async fn put(file_id: &str, document: ParsedDocument) -> Result<Arc<ParsedDocument>> {
    let dir = PathBuf::from(&Config::global().cache_dir);
    write_blob(&dir, file_id, &document).await?;

    let shared = Arc::new(document);
    MEMORY_CACHE.insert(file_id.to_string(), shared.clone());
    debug!("Cached parse result for {}", file_id);
    Ok(shared)
}

/// Fetches a parsed document by `file_id`, memory first, then disk
pub async fn get(file_id: &str) -> Option<Arc<ParsedDocument>> {
    if let Some(hit) = MEMORY_CACHE.get(file_id) {
        debug!("Parse cache memory hit for {}", file_id);
        return Some(hit.value().clone());
    }

    let dir = PathBuf::from(&Config::global().cache_dir);
    let document = read_blob(&dir, file_id).await?;
    let shared = Arc::new(document);
    MEMORY_CACHE.insert(file_id.to_string(), shared.clone());
    debug!("Parse cache disk hit for {}", file_id);
    Some(shared)
}

/// Drops both cache layers for a `file_id`
#[allow(dead_code)]
pub async fn invalidate(file_id: &str) {
    MEMORY_CACHE.remove(file_id);
    let dir = PathBuf::from(&Config::global().cache_dir);
    let _ = tokio::fs::remove_file(blob_path(&dir, file_id)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docforge::extract::types::ExtractionMethod;

    fn sample_document(file_id: &str) -> ParsedDocument {
        ParsedDocument {
            file_id: file_id.to_string(),
            filename: "sample.pdf".to_string(),
            total_pages: 1,
            extraction_method: ExtractionMethod::PdfText,
            paragraphs: Vec::new(),
        }
    }

    fn temp_cache_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("docforge-cache-test-{}-{}", tag, Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_blob_round_trip() {
        let dir = temp_cache_dir("roundtrip");
        let doc = sample_document("f1");

        write_blob(&dir, "f1", &doc).await.unwrap();
        let loaded = read_blob(&dir, "f1").await.unwrap();

        assert_eq!(loaded.file_id, doc.file_id);
        assert_eq!(loaded.filename, doc.filename);
        assert_eq!(loaded.total_pages, doc.total_pages);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_blob_is_a_miss() {
        let dir = temp_cache_dir("missing");
        assert!(read_blob(&dir, "nope").await.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_a_miss() {
        let dir = temp_cache_dir("corrupt");
        std::fs::write(blob_path(&dir, "bad"), b"{ not json").unwrap();
        assert!(read_blob(&dir, "bad").await.is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_no_partial_blob_left_behind() {
        let dir = temp_cache_dir("atomic");
        write_blob(&dir, "f1", &sample_document("f1")).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
