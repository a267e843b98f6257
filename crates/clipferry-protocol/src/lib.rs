//! Wire protocol for Clipferry signaling
//!
//! The signaling server speaks Engine.IO v4 / Socket.IO v4 framing over a
//! WebSocket text channel. [`frame`] handles the packet layer, [`events`]
//! defines the typed JSON payloads that ride inside event packets and
//! relay HTTP bodies, and [`filename`] holds the flat-filename rule the
//! LAN endpoints enforce.

#![forbid(unsafe_code)]

pub mod error;
pub mod events;
pub mod filename;
pub mod frame;

pub use error::ProtocolError;
pub use frame::Packet;

/// Protocol version tag carried by every signaling payload
pub const PROTOCOL_VERSION: &str = "4.0";

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
