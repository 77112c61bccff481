//! Medi-CoPilot Core - shared foundation for the client suite
//!
//! This crate defines the error types, logging setup, configuration, and
//! domain data structures used by the session, API, and CLI crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use tokio;
pub use tracing;
