//! HTTP request handlers for upload and parse operations.

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt;
use log::info;
use uuid::Uuid;

use super::processing::parse_document;
use super::types::{FileType, ParseRequest, UploadedFile};
use crate::config::Config;
use crate::docforge::cache;
use crate::server::error::AppError;

/// Where an upload with the given id and type is stored on disk
fn upload_path(file_id: &str, file_type: FileType) -> std::path::PathBuf {
    std::path::Path::new(&Config::global().uploads_dir)
        .join(format!("{}.{}", file_id, file_type.extension()))
}

/// Locates a previously uploaded file by id, trying each supported extension
async fn find_upload(file_id: &str) -> Option<(std::path::PathBuf, FileType)> {
    for file_type in [FileType::Pdf, FileType::Epub] {
        let path = upload_path(file_id, file_type);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Some((path, file_type));
        }
    }
    None
}

#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Extraction",
    responses(
        (status = 200, description = "File stored, identifier assigned", body = UploadedFile),
        (status = 400, description = "Empty or malformed multipart payload"),
        (status = 415, description = "File type is not PDF or EPUB")
    )
)]
pub async fn upload_file(mut payload: Multipart) -> Result<HttpResponse, AppError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| AppError::InvalidInput(format!("malformed multipart payload: {}", e)))?
    {
        let Some(filename) = field.content_disposition().get_filename().map(String::from) else {
            continue;
        };

        let file_type = FileType::from_filename(&filename).ok_or_else(|| {
            AppError::UnsupportedFormat(format!(
                "unsupported file type for '{}': expected .pdf or .epub",
                filename
            ))
        })?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| AppError::InvalidInput(format!("failed reading upload: {}", e)))?
        {
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(AppError::InvalidInput("uploaded file is empty".to_string()));
        }

        let file_id = Uuid::new_v4().to_string();
        let path = upload_path(&file_id, file_type);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;

        info!(
            "Stored upload {} ({}, {} bytes) as {}",
            filename,
            file_type,
            bytes.len(),
            file_id
        );

        return Ok(HttpResponse::Ok().json(UploadedFile {
            file_id,
            filename,
            file_type,
            file_size: bytes.len() as u64,
        }));
    }

    Err(AppError::InvalidInput(
        "multipart payload contains no file field".to_string(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/parse",
    tag = "Extraction",
    request_body = ParseRequest,
    responses(
        (status = 200, description = "Ordered paragraph records with enrichment metadata"),
        (status = 400, description = "File is unreadable in its declared format"),
        (status = 404, description = "No upload with the given file_id")
    )
)]
pub async fn parse_file(body: web::Json<ParseRequest>) -> Result<HttpResponse, AppError> {
    let parsed = resolve_parsed(&body.file_id).await?;
    Ok(HttpResponse::Ok().json(parsed.as_ref()))
}

/// Resolves the paragraphs of a file: cache first, fresh parse on a miss.
///
/// The extractor is deterministic, so a cached parse is as good as a fresh
/// one. Export and RAG indexing resolve through here as well.
pub async fn resolve_parsed(
    file_id: &str,
) -> Result<std::sync::Arc<super::types::ParsedDocument>, AppError> {
    if let Some(cached) = cache::get(file_id).await {
        info!("Serving cached parse result for {}", file_id);
        return Ok(cached);
    }

    let (path, file_type) = find_upload(file_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("no uploaded file with id {}", file_id)))?;

    let bytes = tokio::fs::read(&path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_id.to_string());

    let owned_id = file_id.to_string();
    let parsed = web::block(move || parse_document(&owned_id, &filename, file_type, &bytes))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("parse task failed: {}", e)))?
        .map_err(|e| AppError::InvalidInput(format!("unreadable file: {}", e)))?;

    let parsed_id = parsed.file_id.clone();
    let shared = cache::put(&parsed_id, parsed).await?;
    Ok(shared)
}
