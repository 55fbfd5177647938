//! Collaboration Relay Module
//!
//! This module contains the server side of a pairing session: room
//! membership, snapshot storage and fan-out of document updates and chat.
//!
//! # Architecture
//!
//! - **`state`** - Room registry (members and merged snapshot per room)
//! - **`handlers`** - WebSocket endpoint speaking the relay protocol
//!
//! # Example
//!
//! ```rust,no_run
//! use xfcollab::backend::collab::RoomRegistry;
//!
//! # async fn example() {
//! let rooms = RoomRegistry::new(2);
//! assert_eq!(rooms.member_count("room-1").await, 0);
//! # }
//! ```

/// Room state management
pub mod state;

/// Relay socket handlers
pub mod handlers;

/// Re-export commonly used types
pub use state::{Member, RoomRegistry};
pub use handlers::ws_handler;
