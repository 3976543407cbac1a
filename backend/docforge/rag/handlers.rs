//! HTTP request handlers for RAG operations.

use actix_web::{web, HttpResponse};
use log::info;
use validator::Validate;

use super::embedder::Embedder;
use super::index;
use super::types::{
    ContextRequest, IndexRequest, IndexResponse, RagStatsResponse, SearchRequest,
};
use crate::docforge::extract::handlers::resolve_parsed;
use crate::server::error::AppError;

#[utoipa::path(
    post,
    path = "/api/rag/index-dataset-file",
    tag = "RAG",
    request_body = IndexRequest,
    responses(
        (status = 200, description = "Paragraphs embedded and indexed", body = IndexResponse),
        (status = 404, description = "No uploaded file with the given file_id")
    )
)]
pub async fn index_dataset_file(body: web::Json<IndexRequest>) -> Result<HttpResponse, AppError> {
    let IndexRequest {
        file_id,
        dataset_id,
        dataset_name,
    } = body.into_inner();

    let parsed = resolve_parsed(&file_id).await?;
    let dataset_id = dataset_id.unwrap_or_else(|| file_id.clone());
    let dataset_name = dataset_name.unwrap_or_else(|| parsed.filename.clone());

    let indexed_documents = index::index_into_global(&parsed, &dataset_id, &dataset_name).await;
    info!(
        "Indexed {} documents from {} into dataset {}",
        indexed_documents, file_id, dataset_id
    );

    Ok(HttpResponse::Ok().json(IndexResponse {
        indexed_documents,
        dataset_id,
    }))
}

#[utoipa::path(
    post,
    path = "/api/rag/search",
    tag = "RAG",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Ranked similarity hits"),
        (status = 400, description = "Out-of-range top_k")
    )
)]
pub async fn search(body: web::Json<SearchRequest>) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    request.validate()?;

    let results =
        index::with_index(|index| index.search(&request, Embedder::global())).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "results": results })))
}

#[utoipa::path(
    post,
    path = "/api/rag/context",
    tag = "RAG",
    request_body = ContextRequest,
    responses(
        (status = 200, description = "Ranked context items"),
        (status = 400, description = "Out-of-range top_k")
    )
)]
pub async fn context(body: web::Json<ContextRequest>) -> Result<HttpResponse, AppError> {
    let request = body.into_inner();
    request.validate()?;

    let context =
        index::with_index(|index| index.build_context(&request, Embedder::global())).await;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "context": context })))
}

#[utoipa::path(
    get,
    path = "/api/rag/stats",
    tag = "RAG",
    responses(
        (status = 200, description = "Index size and coverage", body = RagStatsResponse)
    )
)]
pub async fn stats() -> Result<HttpResponse, AppError> {
    let response = index::with_index(|index| RagStatsResponse {
        stats: index.stats(Embedder::global()),
        indexed_datasets: index.dataset_ids(),
    })
    .await;
    Ok(HttpResponse::Ok().json(response))
}

#[utoipa::path(
    delete,
    path = "/api/rag/dataset/{dataset_id}",
    tag = "RAG",
    responses(
        (status = 200, description = "Dataset removed from the index")
    )
)]
pub async fn remove_dataset(path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let dataset_id = path.into_inner();
    let removed = index::remove_dataset_global(&dataset_id).await;
    info!("Removed {} documents of dataset {}", removed, dataset_id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "removed_documents": removed,
        "dataset_id": dataset_id,
    })))
}
