// Error handling module
// Defines directory error kinds and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Failures of the directory-access layer
///
/// These never escape the router as errors; they are folded into a
/// `QueryResult::Error` value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    /// Credentials were missing at startup
    #[error("Microsoft Graph not configured")]
    NotConfigured,

    /// Token exchange failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-2xx response (including a repeated 401) or transport failure
    #[error("{message}")]
    Upstream { status: Option<u16>, message: String },
}

/// Serialized discriminant for directory errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotConfigured,
    Auth,
    Upstream,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotConfigured => "not_configured",
            ErrorKind::Auth => "auth",
            ErrorKind::Upstream => "upstream",
        }
    }
}

impl DirectoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DirectoryError::NotConfigured => ErrorKind::NotConfigured,
            DirectoryError::Auth(_) => ErrorKind::Auth,
            DirectoryError::Upstream { .. } => ErrorKind::Upstream,
        }
    }
}

/// API errors that can occur during request processing
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Directory query did not finish in time
    #[error("Directory query timed out after {0}s")]
    Timeout(u64),

    /// Error from the language model API
    #[error("Model API error: {status} - {message}")]
    ModelApiError { status: u16, message: String },

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            ApiError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                "timeout",
                format!("Directory query timed out after {}s", secs),
            ),
            ApiError::ModelApiError { status, message } => {
                tracing::error!("Model API error: {} - {}", status, message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "model_api_error",
                    "Failed to process your request. Please check your API key and try again."
                        .to_string(),
                )
            }
            ApiError::Internal(err) => {
                // Log internal errors
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": message,
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}
