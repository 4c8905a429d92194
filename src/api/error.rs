//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::messages;
use crate::chat::ChatError;
use crate::db::DatabaseError;
use crate::knowledge::SyncError;
use crate::pipeline::ExtractionError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
    /// Raw engine reply, present only when extraction produced output
    /// that could not be parsed; clients show it for manual entry.
    #[serde(rename = "rawResponse", skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("Extraction output unparsable")]
    ExtractionUnparsable { raw: String },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut raw_response = None;
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Forbidden(detail) => (StatusCode::FORBIDDEN, "FORBIDDEN", detail.clone()),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail.clone()),
            ApiError::Conflict(detail) => (StatusCode::CONFLICT, "CONFLICT", detail.clone()),
            ApiError::ServiceUnavailable(detail) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                detail.clone(),
            ),
            ApiError::ExtractionUnparsable { raw } => {
                raw_response = Some(raw.clone());
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXTRACTION_UNPARSABLE",
                    messages::EXTRACTION_UNPARSABLE.to_string(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(%detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
            raw_response,
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} {id} not found"))
            }
            DatabaseError::ConstraintViolation(detail) => ApiError::BadRequest(detail),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedMediaType(_) => {
                ApiError::BadRequest(messages::UNSUPPORTED_MEDIA_TYPE.to_string())
            }
            ExtractionError::InvalidPayload(detail) => ApiError::BadRequest(detail),
            ExtractionError::EmptyDocument => {
                ApiError::BadRequest(messages::DOCUMENT_EMPTY.to_string())
            }
            ExtractionError::ServiceUnavailable(_) => {
                ApiError::ServiceUnavailable(messages::EXTRACTION_SERVICE_DOWN.to_string())
            }
            ExtractionError::MalformedExtraction { raw } => ApiError::ExtractionUnparsable { raw },
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Conflict => ApiError::Conflict(err.to_string()),
            SyncError::NotConfigured => {
                ApiError::ServiceUnavailable(messages::OCR_NOT_CONFIGURED.to_string())
            }
            SyncError::Backend(detail) => ApiError::ServiceUnavailable(detail),
            SyncError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{entity} {id} not found"))
            }
            SyncError::Database(db) => db.into(),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::NotConfigured => {
                ApiError::ServiceUnavailable(messages::CHAT_NOT_CONFIGURED.to_string())
            }
            ChatError::AnimalNotFound(id) => ApiError::NotFound(format!("animal {id} not found")),
            ChatError::Database(db) => db.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
