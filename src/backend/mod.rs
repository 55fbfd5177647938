//! Backend Module
//!
//! This module contains the reference relay server for XFCollab pairing
//! sessions. Clients open one WebSocket each; the relay admits them to rooms,
//! keeps a merged snapshot of every room's document and fans out updates and
//! chat.
//!
//! This module is only compiled when the `ssr` feature is enabled.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, router
//! - **`collab`** - Room registry and the relay socket handler
//! - **`auth`** - JWT verification of the bearer credential
//! - **`error`** - Backend-specific error types
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── main.rs         - Relay binary
//! ├── server/         - Server initialization and state
//! ├── collab/         - Rooms and socket handling
//! ├── auth/           - Token verification
//! └── error/          - Error types
//! ```
//!
//! # Protocol
//!
//! The relay speaks the JSON protocol in [`crate::shared::protocol`]:
//!
//! - `JOIN_ROOM` → `YJS_SYNC` with the room snapshot, or `ERROR` if the room is full
//! - `YJS_UPDATE` → merged into the snapshot, forwarded to the other members
//! - `PARTNER_CHAT` → echoed to every member with `senderId` and `sentAt`
//! - `LEAVE_ROOM` or disconnect → `LEFT` to the remaining members
//!
//! # Thread Safety
//!
//! Room state lives behind `Arc<RwLock<_>>`; each socket owns a writer task
//! fed by an unbounded channel whose sender is registered with the room.
//!
//! # Example
//!
//! ```rust,no_run
//! use xfcollab::backend::server::{create_app, RelayConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_app(RelayConfig::new("dev-secret"));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:4000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

/// Server setup and configuration
pub mod server;

/// Rooms and the relay socket
pub mod collab;

/// Backend error types
pub mod error;

/// Token verification
pub mod auth;

/// Re-export commonly used types
pub use server::create_app;
pub use error::BackendError;
pub use collab::RoomRegistry;
