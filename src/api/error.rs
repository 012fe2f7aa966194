//! API error types and conversions

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::storage::StorageError;
use crate::sync::SyncError;

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Storage operation failed
    StorageError(String),

    /// Invalid request parameters
    InvalidRequest(String),

    /// A sync run is already in progress
    Conflict(String),

    /// The monitoring source failed during an on-demand run
    Upstream(String),

    /// An on-demand run hit its deadline
    Timeout(String),

    /// Internal server error
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::StorageError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::StorageError(err.to_string())
    }
}

impl From<&SyncError> for ApiError {
    fn from(err: &SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::AlreadyRunning => ApiError::Conflict(message),
            SyncError::SourceUnavailable(_) => ApiError::Upstream(message),
            SyncError::DeadlineExceeded => ApiError::Timeout(message),
            SyncError::Referential(_) | SyncError::Store(_) => ApiError::StorageError(message),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<SyncError>() {
            Some(sync_err) => ApiError::from(sync_err),
            None => ApiError::Internal(err.to_string()),
        }
    }
}
