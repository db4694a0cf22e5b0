//! HTTP server exposing the game session.
//!
//! ```text
//! +-------------------------------------------+
//! |  Axum HTTP Server                         |
//! |  /health      (GET)  -> health check      |
//! |  /status      (GET)  -> session snapshot  |
//! |  /start_game  (POST) -> new game          |
//! |  /start_turn  (POST) -> open input window |
//! |  /button      (POST) -> inject a press    |
//! |  /finalize    (POST) -> decide + adjust   |
//! |  /predecir    (POST) -> stateless predict |
//! |  /pause /resume /reset (POST)             |
//! +-------------------------------------------+
//!          |
//!          v
//!   SessionCoordinator (shared with the hardware listener)
//! ```

mod handlers;
pub mod types;

pub use handlers::AppState;
pub use types::{ButtonRequest, ErrorResponse, HealthResponse, PhaseResponse, StartGameRequest};

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::coordinator::SessionCoordinator;

/// Start the HTTP server.
///
/// Binds `addr` (port 0 picks a free port) and serves in the background until
/// the returned token is cancelled.
///
/// # Returns
///
/// A tuple containing:
/// - The actual bound address (useful when port=0)
/// - A cancellation token to trigger graceful shutdown
///
/// # Example
///
/// ```ignore
/// let (addr, shutdown) = start_server("127.0.0.1:8000".parse()?, coordinator).await?;
/// println!("Server listening on {}", addr);
///
/// // Later, to shut down:
/// shutdown.cancel();
/// ```
pub async fn start_server(
    addr: SocketAddr,
    coordinator: SessionCoordinator,
) -> anyhow::Result<(SocketAddr, CancellationToken)> {
    let state = AppState::new(coordinator);
    let shutdown_token = CancellationToken::new();

    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("HTTP server listening on {}", actual_addr);

    let server_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_token))
}

/// Create the router with all routes configured.
///
/// This is separated from `start_server` to enable easier testing.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/status", get(handlers::status))
        .route("/start_game", post(handlers::start_game))
        .route("/start_turn", post(handlers::start_turn))
        .route("/button", post(handlers::button))
        .route("/finalize", post(handlers::finalize))
        .route("/predecir", post(handlers::predict))
        .route("/pause", post(handlers::pause))
        .route("/resume", post(handlers::resume))
        .route("/reset", post(handlers::reset))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::coordinator::CoordinatorConfig;
    use crate::decision::FixedDecision;
    use crate::game::{Decision, LevelTable, PatternGenerator};
    use crate::hardware::NullSink;

    fn coordinator() -> SessionCoordinator {
        SessionCoordinator::new(
            PatternGenerator::new(LevelTable::default(), Some(1)),
            Arc::new(NullSink),
            Arc::new(FixedDecision(Decision::Hold)),
            None,
            CoordinatorConfig::default(),
        )
    }

    mod server_tests {
        use super::*;

        #[tokio::test]
        async fn server_binds_random_port_and_shuts_down() {
            let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
            let (bound, shutdown) = start_server(addr, coordinator()).await.unwrap();
            assert_ne!(bound.port(), 0);

            let url = format!("http://{}/health", bound);
            let health: HealthResponse = reqwest::get(&url).await.unwrap().json().await.unwrap();
            assert_eq!(health.status, "ok");

            shutdown.cancel();
        }

        #[tokio::test]
        async fn status_over_the_wire() {
            let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
            let c = coordinator();
            c.start_game(2).await;
            let (bound, shutdown) = start_server(addr, c).await.unwrap();

            let response = reqwest::get(format!("http://{}/status", bound)).await.unwrap();
            assert_eq!(
                response.headers()["cache-control"],
                "no-store, no-cache, must-revalidate"
            );
            let body: serde_json::Value = response.json().await.unwrap();
            assert_eq!(body["status"], "memorizing");
            assert_eq!(body["pattern"].as_array().unwrap().len(), 3);

            shutdown.cancel();
        }
    }
}
