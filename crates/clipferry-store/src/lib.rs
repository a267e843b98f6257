//! Persistent state for Clipferry
//!
//! The configuration file, the application directories, and the
//! collision-safe save rule for received files.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod paths;

pub use config::{Config, ConfigHandle};
pub use error::StoreError;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
