//! Protocol error types

use thiserror::Error;

/// Errors raised by the wire codecs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame does not follow Engine.IO/Socket.IO framing
    #[error("Invalid signaling frame: {0}")]
    InvalidFrame(String),

    /// Filename fails the flat-name rule
    #[error("Bad filename: {0}")]
    BadFilename(String),
}
