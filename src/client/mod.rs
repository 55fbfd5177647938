//! Client Module
//!
//! Everything a pairing client runs: the replicated code buffer, the binding
//! to an editing surface, the relay connection and sync state machine, the
//! partner chat, and the HTTP clients for the question and assistant services.
//!
//! # Module Structure
//!
//! ```text
//! client/
//! ├── document.rs    - Replicated text document (yrs)
//! ├── surface.rs     - EditorSurface trait and in-memory TextBuffer
//! ├── adapter.rs     - Echo guard and document ↔ surface translation
//! ├── transport.rs   - Relay WebSocket transport
//! ├── controller.rs  - Sync state machine
//! ├── chat.rs        - Partner chat reconciliation
//! ├── identity.rs    - Identity hint from the bearer credential
//! ├── config.rs      - Session configuration from the environment
//! ├── services.rs    - Question, execution and assistant HTTP clients
//! └── session.rs     - Session event loop
//! ```
//!
//! # Threading
//!
//! A session is single-threaded. The echo guard and the surface binding use
//! `Rc`/`Cell`, so a session lives on one task; only HTTP calls and socket
//! I/O run in spawned tasks, and they report back through channels.

pub mod document;
pub mod surface;
pub mod adapter;
pub mod transport;
pub mod controller;
pub mod chat;
pub mod identity;
pub mod config;
pub mod services;
pub mod session;

pub use adapter::{EchoGuard, SurfaceAdapter};
pub use chat::{ChatReconciler, ChatRoute};
pub use config::SessionConfig;
pub use controller::{SyncController, SyncStatus};
pub use document::{ChangeOrigin, CodeDocument, DocumentChange, DocumentError};
pub use session::{CollabSession, SessionCommand, SessionEvent};
pub use surface::{EditorSurface, TextBuffer};
pub use transport::{RelayTransport, TransportError, TransportEvent, WsTransport};
