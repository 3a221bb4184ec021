//! Error type system for the gateway
//!
//! This module provides the service-wide error type with:
//! - The gateway error taxonomy (not-found, empty batch, bad payloads,
//!   opaque storage failures)
//! - HTTP status code mapping
//! - JSON error bodies carrying collection/identifier diagnostics

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Main error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No document matched the given collection and identifier.
    #[error("document {id} not found in collection {collection}")]
    NotFound { collection: String, id: String },

    /// A batch create was given an empty array.
    #[error("empty document batch")]
    EmptyBatch,

    /// The request payload has the wrong shape (not a JSON object, or an
    /// array containing non-objects).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Any failure reported by the storage backend. Surfaced opaquely;
    /// the gateway performs no retry or reconnection.
    #[error("storage error: {0}")]
    Storage(#[from] mongodb::error::Error),
}

impl ApiError {
    /// Convenience constructor keeping call sites short.
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        ApiError::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::EmptyBatch | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type name for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "NotFound",
            ApiError::EmptyBatch => "EmptyBatch",
            ApiError::InvalidRequest(_) => "InvalidRequest",
            ApiError::Storage(_) => "StorageError",
        }
    }
}

/// Error response structure for API endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Collection the failing operation targeted, when relevant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Identifier the failing operation targeted, when relevant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ErrorResponse {
    /// Build the wire body for an ApiError
    pub fn from_error(error: &ApiError) -> Self {
        let (collection, id) = match error {
            ApiError::NotFound { collection, id } => {
                (Some(collection.clone()), Some(id.clone()))
            }
            _ => (None, None),
        };
        Self {
            error: error.error_type().to_string(),
            message: error.to_string(),
            collection,
            id,
        }
    }
}

/// Implement IntoResponse for ApiError to enable automatic error handling in Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let body = ErrorResponse::from_error(&self);

        if status_code.is_server_error() {
            tracing::error!(
                error_type = self.error_type(),
                status_code = %status_code,
                "Request failed: {}",
                self
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                status_code = %status_code,
                "Request rejected: {}",
                self
            );
        }

        (status_code, Json(body)).into_response()
    }
}

/// Result type alias for operations that can fail with ApiError
pub type Result<T> = std::result::Result<T, ApiError>;
