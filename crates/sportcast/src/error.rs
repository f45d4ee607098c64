use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use sportcast_sports::AdapterError;

/// Errors from a client transport
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("transport stalled for {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Errors from the snapshot archive
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors from configuration validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Request-level errors surfaced to HTTP callers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid {{sport}} parameter")]
    UnknownSport(String),

    #[error("Missing required {{gameId}} query")]
    MissingGameId,

    #[error("Invalid {{date}} query, expected YYYY-MM-DD: {0}")]
    InvalidDate(String),

    #[error("origin {origin:?} does not match host {host:?}")]
    OriginMismatch { origin: String, host: String },

    #[error("websocket upgrade required")]
    UpgradeRequired,

    #[error("provider error: {0}")]
    Provider(#[from] AdapterError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnknownSport(_)
            | ApiError::MissingGameId
            | ApiError::InvalidDate(_)
            | ApiError::UpgradeRequired => StatusCode::BAD_REQUEST,
            ApiError::OriginMismatch { .. } => StatusCode::FORBIDDEN,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(serde_json::json!({"error": self.to_string()}))).into_response()
    }
}
