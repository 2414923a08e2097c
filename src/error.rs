//! Error types for the image batch service
//!
//! `AppError` covers job-level and boundary errors and maps to HTTP
//! responses for API clients. `TransformError` covers per-URL failures
//! inside the pipeline; those are tolerated and recorded as data, never
//! surfaced as HTTP errors.
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

/// Result type for service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    /// Job Store operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Schema or row content failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Job not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate or out-of-order operation (e.g. re-running a job)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bad request from the boundary layer
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Source file unreadable or other fatal infrastructure failure
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.to_string(),
            code: status.as_u16(),
        })
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Infrastructure(format!("CSV read failed: {err}"))
    }
}

/// Per-URL failure inside the transform pipeline.
///
/// Never escalates to the row or the job; the Row Processor records the
/// failure as a `None` output slot and moves on.
#[derive(Debug, Error)]
pub enum TransformError {
    /// Network error, timeout, or non-2xx response while downloading
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Downloaded bytes are not a decodable image
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Blob Sink refused or failed to persist the output
    #[error("Store failed: {0}")]
    Store(String),

    /// Unexpected pipeline failure (task panic, re-encode error)
    #[error("Transform failed: {0}")]
    Internal(String),
}
