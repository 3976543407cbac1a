//! HTTP request handlers for template validation.

use actix_web::{web, HttpResponse};
use log::debug;
use serde_json::Value;

use super::validate::validate_template;
use crate::server::error::AppError;

#[utoipa::path(
    post,
    path = "/api/dataset/templates/validate",
    tag = "Templates",
    responses(
        (status = 200, description = "Validation report with ordered errors and warnings")
    )
)]
pub async fn validate(body: web::Json<Value>) -> Result<HttpResponse, AppError> {
    let report = validate_template(&body);
    debug!(
        "Template validation: valid={}, {} errors, {} warnings",
        report.valid,
        report.errors.len(),
        report.warnings.len()
    );
    Ok(HttpResponse::Ok().json(report))
}
