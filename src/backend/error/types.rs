/**
 * Backend Error Types
 *
 * This module defines error types specific to the relay server.
 * These errors are used in HTTP handlers and in the WebSocket connection
 * loop; handler errors convert to HTTP responses, connection errors become
 * `ERROR` frames sent to the offending client.
 *
 * # Error Categories
 *
 * ## Authentication Errors
 *
 * The WebSocket upgrade is refused with 401 when the bearer credential is
 * missing, malformed, expired or signed with another secret.
 *
 * ## Room Errors
 *
 * Room errors occur when a client's request conflicts with room state:
 * - Joining a full room
 * - Sending before joining
 *
 * ## Protocol Errors
 *
 * Protocol errors occur when a relay frame cannot be processed:
 * - Unknown message type
 * - Payloads that are not valid base64 or not a valid update
 */

use thiserror::Error;
use axum::http::StatusCode;
use crate::shared::SharedError;

/// Backend-specific error types
///
/// # Usage
///
/// ```rust
/// use xfcollab::backend::error::BackendError;
///
/// let err = BackendError::unauthorized("token expired");
/// let err = BackendError::protocol("payload is not a valid update");
/// ```
#[derive(Debug, Error)]
pub enum BackendError {
    /// Bearer credential missing or rejected
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Human-readable error message
        message: String,
    },

    /// Room already holds its maximum number of members
    #[error("Room {room_id} is full ({capacity} members)")]
    RoomFull {
        room_id: String,
        capacity: usize,
    },

    /// Request needs a joined room
    #[error("Join a room first")]
    NotJoined,

    /// Relay protocol error
    ///
    /// This error occurs when a frame cannot be decoded or applied,
    /// such as an update payload that is not a valid document update.
    #[error("Protocol error: {message}")]
    ProtocolError {
        /// Human-readable error message
        message: String,
    },

    /// Shared error (from shared module)
    #[error(transparent)]
    SharedError(#[from] SharedError),
}

impl BackendError {
    /// Create a new unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    ///
    /// # Arguments
    ///
    /// * `message` - Error message
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `Unauthorized` - 401 Unauthorized
    /// - `RoomFull` - 409 Conflict
    /// - `NotJoined` / `ProtocolError` - 400 Bad Request
    /// - `SharedError` - Depends on the shared error type
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::RoomFull { .. } => StatusCode::CONFLICT,
            Self::NotJoined => StatusCode::BAD_REQUEST,
            Self::ProtocolError { .. } => StatusCode::BAD_REQUEST,
            Self::SharedError(err) => match err {
                SharedError::SerializationError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                SharedError::ValidationError { .. } => StatusCode::BAD_REQUEST,
                SharedError::ProtocolError { .. } => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Get the error message
    ///
    /// # Returns
    ///
    /// A human-readable error message, also used as the text of `ERROR` frames
    pub fn message(&self) -> String {
        match self {
            Self::Unauthorized { message } => message.clone(),
            Self::ProtocolError { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
