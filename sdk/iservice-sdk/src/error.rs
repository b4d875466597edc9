//! Error types
//!
//! Errors surfaced by the client. Connect failures never escape `start()`;
//! they are logged and reported through its outcome instead.

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors produced by the WebSocket client
#[derive(Debug, Error)]
pub enum ClientError {
    /// `send()` was called without an active channel
    #[error("connection is not ready")]
    ConnectionNotReady,

    /// No destination URI was configured
    #[error("no destination URI configured")]
    ConfigurationMissing,

    /// The destination URI could not be used to reach a server
    #[error("invalid destination URI `{uri}`: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// TCP connection to the remote endpoint failed
    #[error("failed to connect to {addr}: {source}")]
    Io {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The WebSocket upgrade handshake failed
    #[error("websocket handshake failed: {0}")]
    Handshake(#[from] tungstenite::Error),

    /// The message envelope could not be encoded
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result alias used throughout the SDK
pub type Result<T, E = ClientError> = std::result::Result<T, E>;
