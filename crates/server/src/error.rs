// crates/server/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use trailview_core::{ConfigError, DiscoveryError, ParseError};

/// Structured JSON error response for API errors.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

/// API error types that map to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            ApiError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::with_details("Session not found", format!("Session ID: {}", id)),
            ),
            ApiError::Discovery(DiscoveryError::SessionNotFound { id }) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::with_details("Session not found", format!("Session ID: {}", id)),
            ),
            ApiError::Discovery(err) => {
                tracing::error!(error = %err, "Discovery error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Discovery failed", err.to_string()),
                )
            }
            ApiError::Parse(err) => {
                let status = match err {
                    ParseError::NotFound { .. } => StatusCode::NOT_FOUND,
                    ParseError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
                    ParseError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                tracing::error!(error = %err, "Transcript parse error");
                (
                    status,
                    ErrorResponse::with_details("Could not read session", err.to_string()),
                )
            }
            ApiError::Config(ConfigError::DuplicateProfile { path }) => (
                StatusCode::CONFLICT,
                ErrorResponse::with_details("Profile already configured", path.clone()),
            ),
            ApiError::Config(ConfigError::ProfileNotFound { path }) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::with_details("Profile not found", path.clone()),
            ),
            ApiError::Config(err) => {
                tracing::error!(error = %err, "Config error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_details("Config error", err.to_string()),
                )
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new(msg.clone()))
            }
        };

        (status, Json(error_response)).into_response()
    }
}
