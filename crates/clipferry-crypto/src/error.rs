//! Error types for cryptographic operations

use thiserror::Error;

/// Errors that can occur while sealing or opening envelopes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material has the wrong length or cannot be decoded
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Error during encryption
    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Envelope is truncated, tampered with, or fails tag verification
    #[error("Corrupted envelope: {0}")]
    CorruptedEnvelope(String),

    /// Base64 input cannot be decoded
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),
}
