//! Error handling for Elephant Camserver

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Config error (fatal at startup)
    #[error("Config error: {0}")]
    Config(String),

    /// Detector (inference server) error
    #[error("Detector error: {0}")]
    Detector(String),

    /// Frame source error
    #[error("Frame source error: {0}")]
    FrameSource(String),

    /// Snapshot write error
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Delivery sink error
    #[error("Sink {sink} failed: {message}")]
    Sink { sink: String, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            Error::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                msg.clone(),
            ),
            Error::Detector(msg) => (StatusCode::BAD_GATEWAY, "DETECTOR_ERROR", msg.clone()),
            Error::FrameSource(msg) => (
                StatusCode::BAD_GATEWAY,
                "FRAME_SOURCE_ERROR",
                msg.clone(),
            ),
            Error::Snapshot(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SNAPSHOT_ERROR",
                msg.clone(),
            ),
            Error::Sink { sink, message } => (
                StatusCode::BAD_GATEWAY,
                "SINK_ERROR",
                format!("{}: {}", sink, message),
            ),
            Error::Serialization(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "SERIALIZATION_ERROR",
                e.to_string(),
            ),
            Error::Http(e) => (StatusCode::BAD_GATEWAY, "HTTP_ERROR", e.to_string()),
            Error::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR", e.to_string()),
        };

        tracing::error!(
            status = %status,
            error_code = %error_code,
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error_code": error_code,
            "message": message
        }));

        (status, body).into_response()
    }
}
