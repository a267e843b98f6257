//! Cryptography for Clipferry — the AEAD envelope and room-key handling
//!
//! Everything a room exchanges is sealed into an *envelope*:
//! a 12-byte random nonce, the AES-256-GCM ciphertext, and the 16-byte
//! authentication tag, concatenated in that order. The envelope is the
//! only ciphertext format on the wire; text payloads carry it
//! base64-encoded, file bodies carry it raw.

#![forbid(unsafe_code)]

pub mod envelope;
pub mod error;
pub mod keys;

pub use envelope::{decrypt, encrypt, NONCE_LEN, OVERHEAD, TAG_LEN};
pub use error::CryptoError;
pub use keys::{decode_key, from_base64, generate_key_base64, to_base64, RoomKey, KEY_LEN};

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
