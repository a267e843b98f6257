//! Network error types

use thiserror::Error;

/// Network layer errors
#[derive(Error, Debug)]
pub enum NetworkError {
    /// Request never reached the peer (DNS, TCP, TLS, timeout)
    #[error("Transport failure: {0}")]
    Transport(String),

    /// WebSocket connection could not be established or broke down
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// URL cannot be parsed or converted
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No usable port could be bound for the LAN server
    #[error("No free port in {0}")]
    NoFreePort(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for NetworkError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::ConnectionFailed(err.to_string())
    }
}
