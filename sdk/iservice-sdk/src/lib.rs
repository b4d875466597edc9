//! iservice SDK
//!
//! This crate provides a minimal WebSocket client for the iservice platform:
//! one outbound session per client, JSON message envelopes for outgoing
//! payloads, and a single injectable observer for inbound frames.

pub mod client;
pub mod connection;
pub mod error;

// Re-exports for convenience
pub use client::state::{ClientState, ClientStateManager};
pub use connection::observer::{ChannelObserver, ClientEvent, LoggingObserver, MessageObserver};
pub use connection::options::ClientOptions;
pub use connection::protocol::WrappedMessage;
pub use connection::websocket::{CloseGuard, StartOutcome, WebSocketClient, WebSocketClientBuilder};
pub use error::{ClientError, Result};
pub use uuid::Uuid;
