//! Server Module
//!
//! This module contains the code that configures and assembles the relay's
//! Axum application.
//!
//! # Architecture
//!
//! - **`state`** - Application state structure and `FromRef` implementations
//! - **`config`** - Configuration loading and validation
//! - **`init`** - Router creation
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs          - Module exports and documentation
//! ├── state.rs        - AppState and FromRef implementations
//! ├── config.rs       - Configuration loading (address, secret, capacity)
//! └── init.rs         - Router creation
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration Loading**: `RelayConfig::from_env`
//! 2. **State Creation**: an empty room registry sized by the configuration
//! 3. **Router Creation**: `/ws` and `/health`

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

// Re-export commonly used types
pub use config::RelayConfig;
pub use init::create_app;
pub use state::AppState;
