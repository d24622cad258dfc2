//! API error types
//!
//! Maps failures to HTTP responses with a `{"error": CODE, "message": ...}`
//! body. Only boundary rejections and persistence failures ever reach a
//! caller; delivery failures are handled inside the dispatcher.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::ingest::IngestError;
use crate::registry::ChannelError;
use crate::store::StoreError;

/// API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Channel name in the path is malformed
    #[error("invalid channel: {0}")]
    InvalidChannel(#[from] ChannelError),

    /// Stream connection limit reached
    #[error("too many open event streams")]
    TooManyStreams,

    /// Ingestion failed to persist
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Store read failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidChannel(_) => StatusCode::BAD_REQUEST,
            Self::TooManyStreams => StatusCode::SERVICE_UNAVAILABLE,
            Self::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidChannel(_) => "INVALID_CHANNEL",
            Self::TooManyStreams => "TOO_MANY_STREAMS",
            Self::Ingest(_) => "STORE_FAILED",
            Self::Store(_) => "STORE_FAILED",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code (machine-readable)
    pub error: &'static str,
    /// Error message (human-readable)
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
        };

        if status.is_server_error() {
            tracing::error!(
                error_code = body.error,
                error_message = %body.message,
                status = %status,
                "API error"
            );
        } else {
            tracing::warn!(
                error_code = body.error,
                error_message = %body.message,
                status = %status,
                "API error"
            );
        }

        (status, Json(body)).into_response()
    }
}
