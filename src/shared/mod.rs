//! Shared Module
//!
//! This module contains types and data structures that are shared between
//! the pairing client and the relay server: the wire protocol, chat entries,
//! positional edit descriptors, editor languages and configuration.
//!
//! # Overview
//!
//! The shared module provides platform-agnostic types that can be used
//! in both server and client code. All wire types are designed for JSON
//! serialization over the relay WebSocket.

/// Chat entry data structures
pub mod message;

/// Relay wire protocol
pub mod protocol;

/// Shared error types
pub mod error;

/// Positional edits and document deltas
pub mod crdt;

/// Bounds check for inbound document updates
pub mod update;

/// Editor languages and starter templates
pub mod language;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use message::{ChatMessage, ChatRole, PartnerNotice};
pub use protocol::{ClientMessage, ServerMessage};
pub use error::SharedError;
pub use crdt::{DeltaOp, EditOp};
pub use language::Language;
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
