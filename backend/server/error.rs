//! Application error handling and conversion to HTTP responses.
//!
//! This module defines the error taxonomy for the service. Every failure that
//! crosses the HTTP boundary carries a machine-readable kind plus a human
//! message, serialized as `{"error": "<KIND>", "message": "..."}` with an
//! appropriate 4xx/5xx status.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::fmt;

/// Machine-readable error kinds exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed request: bad JSON, wrong field types, out-of-range values
    InvalidInput,
    /// file_id, template id, or export artifact missing
    NotFound,
    /// File type not PDF/EPUB, or export format not csv/jsonl
    UnsupportedFormat,
    /// Batch size above the configured ceiling
    BatchTooLarge,
    /// The NLP model cannot be loaded (analyzer degrades, some callers care)
    DependencyUnavailable,
    /// Anything else
    Internal,
}

/// Application-specific error type convertible to an HTTP response
#[derive(Debug)]
pub enum AppError {
    /// Malformed request payloads and out-of-range parameters
    InvalidInput(String),
    /// Missing files, templates, or export artifacts
    NotFound(String),
    /// File or export formats outside the supported set
    UnsupportedFormat(String),
    /// Batch-analysis requests above the size ceiling
    BatchTooLarge(String),
    /// Unavailable external dependency (NLP model, OCR)
    DependencyUnavailable(String),
    /// Filesystem errors
    Io(std::io::Error),
    /// External or otherwise uncategorized errors
    Internal(anyhow::Error),
}

impl AppError {
    /// The taxonomy kind this error maps to
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::BatchTooLarge(_) => ErrorKind::BatchTooLarge,
            Self::DependencyUnavailable(_) => ErrorKind::DependencyUnavailable,
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// JSON body attached to every error response
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorKind,
    message: String,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Self::NotFound(msg) => write!(f, "Not found: {}", msg),
            Self::UnsupportedFormat(msg) => write!(f, "Unsupported format: {}", msg),
            Self::BatchTooLarge(msg) => write!(f, "Batch too large: {}", msg),
            Self::DependencyUnavailable(msg) => write!(f, "Dependency unavailable: {}", msg),
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::BatchTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::Io(_) | Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind(),
            message,
        })
    }
}

/// Conversion from IO errors
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Conversion from anyhow errors (generic external errors)
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Conversion from payload validation errors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serialization() {
        let body = serde_json::to_value(ErrorKind::BatchTooLarge).unwrap();
        assert_eq!(body, serde_json::json!("BATCH_TOO_LARGE"));
        let body = serde_json::to_value(ErrorKind::InvalidInput).unwrap();
        assert_eq!(body, serde_json::json!("INVALID_INPUT"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidInput("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::UnsupportedFormat("x".into()).status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let err = AppError::Internal(anyhow::anyhow!("secret connection string"));
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
