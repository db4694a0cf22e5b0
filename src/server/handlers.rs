//! HTTP request handlers for the game server.
//!
//! Each handler is a thin shim over one `SessionCoordinator` operation. State
//! conflicts come back as `409 Conflict` with an `ErrorResponse` body.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use super::types::*;
use crate::coordinator::{
    ButtonOutcome, DecisionInput, FinalizeResponse, GameStarted, SessionCoordinator,
};
use crate::decision::{PredictionRequest, PredictionResponse};
use crate::error::LedpanelError;
use crate::game::{RoundStats, Signal};

/// Application state shared across all handlers
pub struct AppState {
    pub coordinator: SessionCoordinator,
}

impl AppState {
    pub fn new(coordinator: SessionCoordinator) -> Arc<Self> {
        Arc::new(Self { coordinator })
    }
}

// =============================================================================
// Health and status
// =============================================================================

/// Health check endpoint.
///
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Snapshot of the session.
///
/// The panel UI polls this, so every caching layer is told not to keep it.
///
/// # Example Response
///
/// ```json
/// {
///   "level": 1,
///   "pattern": [3, 1],
///   "user_input": [3],
///   "errors": 0,
///   "streak": 0,
///   "start_time": "2024-01-01T00:00:00Z",
///   "status": "playing"
/// }
/// ```
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        Json(state.coordinator.status()),
    )
}

// =============================================================================
// Round lifecycle
// =============================================================================

/// Start a new game. Body `{"level": n}`; the level is clamped.
pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartGameRequest>,
) -> Json<GameStarted> {
    Json(state.coordinator.start_game(req.level).await)
}

/// Open the input window.
///
/// - `200 OK`: now playing
/// - `409 Conflict`: not memorizing
pub async fn start_turn(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PhaseResponse>, ApiError> {
    let status = state.coordinator.start_turn().map_err(api_error)?;
    Ok(Json(PhaseResponse { status }))
}

/// Inject a button press, as the panel listener would.
///
/// - `200 OK`: press applied or ignored
/// - `400 Bad Request`: value outside the alphabet
pub async fn button(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ButtonRequest>,
) -> Result<Json<ButtonOutcome>, ApiError> {
    let signal = Signal::new(req.signal)
        .ok_or_else(|| api_error(LedpanelError::InvalidSignal(req.signal)))?;
    Ok(Json(state.coordinator.submit_button(signal)))
}

/// Finalize the round and apply the difficulty decision.
///
/// An empty body finalizes from the session's own counters. A `RoundStats`
/// body supplies the stats instead:
///
/// ```json
/// { "level": 1, "correct_count": 2, "error_count": 0, "elapsed": 4.0, "streak": 0 }
/// ```
///
/// - `200 OK`: `FinalizeResponse`
/// - `400 Bad Request`: malformed stats
/// - `409 Conflict`: no finished round, already finalized, or superseded
pub async fn finalize(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<FinalizeResponse>, ApiError> {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        DecisionInput::Autonomous
    } else {
        let stats: RoundStats = serde_json::from_slice(&body).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::with_code(
                    format!("Invalid round stats: {}", e),
                    "INVALID_STATS",
                )),
            )
        })?;
        DecisionInput::Supplied(stats)
    };

    state
        .coordinator
        .finalize_and_adjust(input)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Stateless prediction in the model service's own wire format.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PredictionRequest>,
) -> Json<PredictionResponse> {
    let decision = state.coordinator.predict(&RoundStats::from(req)).await;
    Json(PredictionResponse::from_decision(decision))
}

// =============================================================================
// Direct transitions
// =============================================================================

pub async fn pause(State(state): State<Arc<AppState>>) -> Json<PhaseResponse> {
    Json(PhaseResponse {
        status: state.coordinator.pause(),
    })
}

/// - `409 Conflict`: not paused
pub async fn resume(State(state): State<Arc<AppState>>) -> Result<Json<GameStarted>, ApiError> {
    state.coordinator.resume().await.map(Json).map_err(api_error)
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Json<PhaseResponse> {
    state.coordinator.reset();
    Json(PhaseResponse {
        status: state.coordinator.status().phase,
    })
}
