//! Networking layer for Clipferry
//!
//! One-shot HTTP against the relay, the signaling WebSocket with its
//! reconnect supervisor, the embedded LAN server that hands encrypted
//! blobs to co-local peers, and local network metadata for the join
//! handshake.

#![forbid(unsafe_code)]

pub mod error;
pub mod http;
pub mod lan;
pub mod netinfo;
pub mod signaling;
pub mod ws;

pub use error::NetworkError;
pub use http::{HttpClient, HttpResponse};
pub use signaling::{ConnectionStatus, SignalingClient, SignalingEvent};

/// Result type for network operations
pub type Result<T> = std::result::Result<T, NetworkError>;
