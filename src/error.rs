//! Error types for imgrelay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for imgrelay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for imgrelay.
///
/// One variant per externally visible error kind, so tests can assert on
/// the kind instead of matching message strings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Prompt is required")]
    Validation,

    #[error("Image generation failed: {details}")]
    Upstream { status: u16, details: String },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        // Transport and body-read failures are internal, not upstream:
        // upstream errors carry a status code the provider actually sent.
        Error::Internal(e.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Error::Config(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": "Internal server error",
                    "message": e.to_string(),
                }),
            ),
            Error::Validation => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "Prompt is required" }),
            ),
            Error::Upstream { status, details } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                serde_json::json!({
                    "error": "Image generation failed",
                    "details": details,
                }),
            ),
            Error::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({
                    "error": "Internal server error",
                    "message": message,
                }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}
