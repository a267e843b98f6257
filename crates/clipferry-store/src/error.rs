//! Store error types

use thiserror::Error;

/// Storage layer errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Configuration file cannot be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// Filesystem layout problem (missing dirs, unwritable paths)
    #[error("Path error: {0}")]
    Path(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
