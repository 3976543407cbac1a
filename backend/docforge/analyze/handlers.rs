//! HTTP request handlers for text analysis operations.

use actix_web::{web, HttpResponse};
use log::debug;
use validator::Validate;

use super::batch::analyze_batch;
use super::engine::NlpEngine;
use super::types::{
    AnalyzeRequest, AnalyzerFeatures, AnalyzerHealth, BatchAnalyzeRequest,
};
use crate::server::error::AppError;

#[utoipa::path(
    post,
    path = "/api/mine/analyze",
    tag = "Mining",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis result with the requested subsystems"),
        (status = 400, description = "Out-of-range options or oversized text")
    )
)]
pub async fn analyze(body: web::Json<AnalyzeRequest>) -> Result<HttpResponse, AppError> {
    let AnalyzeRequest { text, options } = body.into_inner();
    options.validate()?;

    debug!(
        "Analyzing {} bytes (entities={}, keywords={}, sentiment={}, statistics={}, summary={})",
        text.len(),
        options.include_entities,
        options.include_keywords,
        options.include_sentiment,
        options.include_statistics,
        options.include_summary
    );

    let result = web::block(move || NlpEngine::global().analyze(&text, &options))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("analysis task failed: {}", e)))??;

    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    post,
    path = "/api/mine/batch-analyze",
    tag = "Mining",
    request_body = BatchAnalyzeRequest,
    responses(
        (status = 200, description = "Aggregated batch analysis result"),
        (status = 400, description = "Empty batch or out-of-range options"),
        (status = 413, description = "Batch exceeds the configured ceiling")
    )
)]
pub async fn batch_analyze(body: web::Json<BatchAnalyzeRequest>) -> Result<HttpResponse, AppError> {
    let BatchAnalyzeRequest { texts, options } = body.into_inner();
    options.validate()?;

    debug!("Batch-analyzing {} texts", texts.len());

    let result = web::block(move || analyze_batch(NlpEngine::global(), &texts, &options))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("batch task failed: {}", e)))??;

    Ok(HttpResponse::Ok().json(result))
}

#[utoipa::path(
    get,
    path = "/api/mine/health",
    tag = "Mining",
    responses(
        (status = 200, description = "Analyzer capability report", body = AnalyzerHealth)
    )
)]
pub async fn health() -> HttpResponse {
    let model_available = NlpEngine::global().model_available();
    HttpResponse::Ok().json(AnalyzerHealth {
        status: "ok",
        model_available,
        features: AnalyzerFeatures {
            entities: true,
            keywords: true,
            sentiment: true,
            statistics: true,
            summary: true,
            batch: true,
        },
    })
}
