/**
 * Relay Configuration
 *
 * This module handles loading and validation of the relay's configuration.
 *
 * # Configuration Sources
 *
 * Configuration is loaded from environment variables, with sensible defaults
 * for local development when possible:
 *
 * | Variable | Default | Meaning |
 * |---|---|---|
 * | `RELAY_ADDR` | `127.0.0.1:4000` | Listen address |
 * | `JWT_SECRET` | required | HS256 secret for bearer tokens |
 * | `ROOM_CAPACITY` | `2` | Members allowed per room |
 *
 * # Error Handling
 *
 * Unlike the client, the relay refuses to start without a signing secret.
 */

use crate::shared::config::ConfigError;
use std::net::SocketAddr;

/// Default listen address
pub const DEFAULT_ADDR: &str = "127.0.0.1:4000";

/// Default members per room
pub const DEFAULT_ROOM_CAPACITY: usize = 2;

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address the relay listens on
    pub addr: SocketAddr,
    /// Secret used to verify bearer tokens
    pub jwt_secret: String,
    /// Maximum members per room
    pub room_capacity: usize,
}

impl RelayConfig {
    /// Configuration with default address and capacity
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            jwt_secret: jwt_secret.into(),
            room_capacity: DEFAULT_ROOM_CAPACITY,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_room_capacity(mut self, capacity: usize) -> Self {
        self.room_capacity = capacity;
        self
    }

    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// - `MissingValue` if `JWT_SECRET` is unset or blank
    /// - `InvalidValue` if `RELAY_ADDR` or `ROOM_CAPACITY` does not parse,
    ///   or the capacity is zero
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingValue("JWT_SECRET"))?;

        let addr = std::env::var("RELAY_ADDR")
            .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "RELAY_ADDR",
                message: e.to_string(),
            })?;

        let room_capacity = match std::env::var("ROOM_CAPACITY") {
            Ok(raw) => raw.trim().parse::<usize>().map_err(|e| ConfigError::InvalidValue {
                field: "ROOM_CAPACITY",
                message: e.to_string(),
            })?,
            Err(_) => DEFAULT_ROOM_CAPACITY,
        };
        if room_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ROOM_CAPACITY",
                message: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            addr,
            jwt_secret,
            room_capacity,
        })
    }
}
