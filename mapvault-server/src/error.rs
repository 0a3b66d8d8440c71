//! API error types.

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mapvault_core::{AnnotationError, StoreError};
use mapvault_data::{IngestError, RetrieveError};
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or unknown bearer token.
    #[error("Authentication failed")]
    Unauthorized,

    /// Owner-scoped record not found.
    #[error("{0}")]
    NotFound(&'static str),

    /// Server-side failure outside the stores.
    #[error("{0}")]
    Internal(String),

    /// Upload rejected or not stored.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Stored file could not be returned.
    #[error(transparent)]
    Retrieve(#[from] RetrieveError),

    /// Annotation payload failed validation.
    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    /// A store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Internal(_) => "internal_error",
            Self::Ingest(err) => match err {
                IngestError::NoFileProvided => "no_file",
                IngestError::UnsupportedExtension { .. } => "unsupported_extension",
                IngestError::SizeExceeded { .. } => "size_exceeded",
                IngestError::MalformedContent { .. } => "malformed_content",
                IngestError::StoreFailure { .. } => "storage_error",
            },
            Self::Retrieve(RetrieveError::NotFound) => "file_not_found",
            Self::Retrieve(_) | Self::Store(_) => "storage_error",
            Self::Annotation(_) => "invalid_annotation",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::Annotation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Ingest(err) if err.is_storage_failure() => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Ingest(_) => StatusCode::BAD_REQUEST,
            // Unknown and hidden files answer 400, matching the upload route.
            Self::Retrieve(RetrieveError::NotFound) => StatusCode::BAD_REQUEST,
            Self::Retrieve(_) | Self::Store(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
