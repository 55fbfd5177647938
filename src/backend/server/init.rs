/**
 * Server Initialization
 *
 * This module builds the relay's Axum router.
 *
 * # Routes
 *
 * - `GET /ws?token=<jwt>` - Relay WebSocket
 * - `GET /health` - Liveness probe, returns `ok`
 */

use crate::backend::collab::{ws_handler, RoomRegistry};
use crate::backend::server::config::RelayConfig;
use crate::backend::server::state::AppState;
use axum::{extract::State, routing::get, Router};

/// Create the relay application
///
/// # Example
///
/// ```rust,no_run
/// use xfcollab::backend::server::{config::RelayConfig, init::create_app};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = RelayConfig::from_env()?;
/// let listener = tokio::net::TcpListener::bind(config.addr).await?;
/// axum::serve(listener, create_app(config)).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_app(config: RelayConfig) -> Router {
    tracing::info!(
        "[Relay] Rooms hold at most {} members",
        config.room_capacity
    );
    let state = AppState::new(config);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .with_state(state)
}

async fn health(State(rooms): State<RoomRegistry>) -> &'static str {
    tracing::debug!("[Relay] Health check, {} open rooms", rooms.room_count().await);
    "ok"
}
