//! Error handling
//!
//! Defines error types for the bridge.

pub mod types;

pub use types::*;

pub type Result<T> = std::result::Result<T, BridgeError>;
