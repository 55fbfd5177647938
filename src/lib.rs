//! XFCollab - Main Library
//!
//! XFCollab keeps a shared code buffer consistent between two people solving a
//! problem together. Each participant holds a replica of the buffer as a Yjs
//! compatible CRDT; edits travel through a small WebSocket relay that also
//! carries partner chat.
//!
//! # Overview
//!
//! This library provides:
//! - A replicated text document with origin-tagged change notifications
//! - Echo-free binding between the document and an editing surface
//! - A relay transport and the sync state machine around it
//! - Partner chat with optimistic sends confirmed by the relay's echo
//! - A reference relay server (feature `ssr`)
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between client and relay
//!   - Wire protocol, chat entries, edit operations
//!   - Languages and templates, configuration, errors
//!
//! - **`client`** - The pairing client
//!   - Document, surface adapter, transport, sync controller
//!   - Chat reconciler, external services, session loop
//!
//! - **`backend`** - Relay server (only compiled with `ssr` feature)
//!   - Axum WebSocket endpoint with JWT verification
//!   - Room membership, snapshot merging, update fan-out
//!
//! # Feature Flags
//!
//! - **`ssr`** - Builds the relay server (axum, jsonwebtoken)
//!
//! # Usage
//!
//! ## Client
//!
//! ```rust,no_run
//! use xfcollab::client::{CollabSession, SessionCommand, SessionConfig};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::from_env()?;
//! let (events_tx, _events_rx) = mpsc::unbounded_channel();
//! let (commands_tx, commands_rx) = mpsc::unbounded_channel();
//! let (session, transport_events) = CollabSession::connect(&config, events_tx);
//! commands_tx.send(SessionCommand::Chat("@partner ready?".into()))?;
//! session.run(transport_events, commands_rx).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Relay
//!
//! ```rust,ignore
//! use xfcollab::backend::server::{config::RelayConfig, init::create_app};
//!
//! let app = create_app(RelayConfig::from_env()?);
//! axum::serve(listener, app).await?;
//! ```
//!
//! # Thread Safety
//!
//! - **Client**: one session per task; state is `Rc`/`Cell` based
//! - **Relay**: room state is shared across connections behind `Arc<RwLock<>>`
//!
//! # Error Handling
//!
//! - `Result<T, E>` with `thiserror` enums per layer
//! - Malformed relay payloads are logged and dropped, never fatal

/// Shared types and data structures
pub mod shared;

/// Pairing client
pub mod client;

/// Relay server
#[cfg(feature = "ssr")]
pub mod backend;
