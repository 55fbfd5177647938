/**
 * Application State Management
 *
 * This module defines the relay's application state and implements the
 * `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * `AppState` holds:
 * - The room registry (members and snapshot per room)
 * - The relay configuration (signing secret, capacity)
 *
 * # Thread Safety
 *
 * The registry wraps its rooms in `Arc<RwLock<_>>` and the configuration is
 * immutable behind an `Arc`, so cloning the state per request is cheap.
 *
 * # Example
 *
 * ```rust
 * use xfcollab::backend::server::{config::RelayConfig, state::AppState};
 *
 * let state = AppState::new(RelayConfig::new("secret"));
 * assert_eq!(state.rooms.capacity(), 2);
 * ```
 */

use crate::backend::collab::state::RoomRegistry;
use crate::backend::server::config::RelayConfig;
use axum::extract::FromRef;
use std::sync::Arc;

/// Relay application state
#[derive(Debug, Clone)]
pub struct AppState {
    /// All open rooms
    pub rooms: RoomRegistry,
    /// Relay configuration
    pub config: Arc<RelayConfig>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            rooms: RoomRegistry::new(config.room_capacity),
            config: Arc::new(config),
        }
    }
}

impl FromRef<AppState> for RoomRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.rooms.clone()
    }
}
