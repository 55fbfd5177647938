//! Authentication Module
//!
//! This module verifies the bearer credential that a pairing client sends
//! as the `token` query parameter when it opens the relay socket.
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Module exports and documentation
//! └── sessions.rs     - JWT token management
//! ```
//!
//! # Security
//!
//! - Tokens are HS256 JWTs signed with `JWT_SECRET`
//! - Expired or mis-signed tokens are rejected with 401 before the upgrade
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use xfcollab::backend::auth::{create_token, verify_token};
//!
//! let token = create_token("user-1", "secret", Duration::from_secs(3600)).unwrap();
//! let claims = verify_token(&token, "secret").unwrap();
//! assert_eq!(claims.sub, "user-1");
//! ```

/// JWT token generation and validation
pub mod sessions;

// Re-export commonly used types
pub use sessions::{create_token, verify_token, Claims};
