//! Request/Response types for the HTTP server.
//!
//! Coordinator results (`GameStarted`, `ButtonOutcome`, `FinalizeResponse`,
//! `SessionState`) are serialized as they are; only the request bodies and
//! the small wrappers live here.

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::error::LedpanelError;
use crate::game::Phase;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Server status (always "ok" when healthy)
    pub status: String,
    /// Server version from Cargo.toml
    pub version: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

fn default_level() -> i64 {
    1
}

/// Body of `POST /start_game`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartGameRequest {
    /// Starting level, clamped server-side (defaults to 1)
    #[serde(default = "default_level")]
    pub level: i64,
}

/// Body of `POST /button`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ButtonRequest {
    /// Raw button value; must be inside the panel alphabet
    pub signal: i64,
}

/// Phase after a direct transition (`/start_turn`, `/pause`, `/reset`)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseResponse {
    pub status: Phase,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code for programmatic handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Error half of every fallible handler.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a session error to its HTTP status and body.
pub fn api_error(err: LedpanelError) -> ApiError {
    let status = match &err {
        LedpanelError::InvalidTransition { .. } | LedpanelError::Superseded(_) => {
            StatusCode::CONFLICT
        }
        LedpanelError::InvalidSignal(_) => StatusCode::BAD_REQUEST,
        LedpanelError::ConfigurationFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse::with_code(err.to_string(), err.code())),
    )
}
