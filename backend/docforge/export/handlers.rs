//! HTTP request handlers for export operations.

use actix_files::NamedFile;
use actix_web::{web, HttpRequest, HttpResponse};
use log::info;

use super::types::{ExportFormat, ExportRequest};
use super::writer::export_document;
use crate::config::Config;
use crate::docforge::analyze::NlpEngine;
use crate::docforge::extract::handlers::resolve_parsed;
use crate::server::error::AppError;

#[utoipa::path(
    post,
    path = "/api/export",
    tag = "Export",
    request_body = ExportRequest,
    responses(
        (status = 200, description = "Artifact written, metadata returned"),
        (status = 404, description = "No uploaded file with the given file_id")
    )
)]
pub async fn export(body: web::Json<ExportRequest>) -> Result<HttpResponse, AppError> {
    let ExportRequest {
        file_id,
        format,
        include_annotations,
        include_nlp,
    } = body.into_inner();

    let document = resolve_parsed(&file_id).await?;

    let result = web::block(move || {
        export_document(
            &document,
            format,
            include_annotations,
            include_nlp,
            NlpEngine::global(),
        )
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("export task failed: {}", e)))??;

    info!(
        "Export ready: {} ({} records)",
        result.filename, result.record_count
    );
    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    get,
    path = "/api/export/{file_id}",
    tag = "Export",
    responses(
        (status = 200, description = "The export artifact bytes"),
        (status = 404, description = "No export artifact for the given file_id")
    )
)]
pub async fn download(
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let file_id = path.into_inner();
    let exports_dir = std::path::PathBuf::from(&Config::global().exports_dir);

    for format in [ExportFormat::Csv, ExportFormat::Jsonl] {
        let candidate = exports_dir.join(format!("{}_export.{}", file_id, format.extension()));
        if candidate.exists() {
            let file = NamedFile::open(candidate)?;
            return Ok(file.into_response(&req));
        }
    }

    Err(AppError::NotFound(format!(
        "no export artifact for {}",
        file_id
    )))
}
