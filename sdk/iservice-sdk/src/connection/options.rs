//! Connection Options
//!
//! Immutable destination settings for a [`WebSocketClient`](super::websocket::WebSocketClient).

use tokio_tungstenite::tungstenite::http::Uri;

use crate::error::{ClientError, Result};

/// Default cap for a single inbound message (10 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Destination of the WebSocket session.
///
/// The TCP connection is dialled to `host:port` while the upgrade request is
/// made against `uri`, so the two may point at different places when a tunnel
/// or proxy sits in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    uri: String,
    host: String,
    port: u16,
    max_message_size: usize,
}

impl ClientOptions {
    /// Create options from an explicit URI, host and port
    pub fn new(uri: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            uri: uri.into(),
            host: host.into(),
            port,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Create options by deriving host and port from the URI authority
    pub fn from_uri(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        let (host, port) = authority_of(&uri)?;
        Ok(Self::new(uri, host, port))
    }

    /// Override the maximum inbound message size
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Whether a destination URI is configured at all
    pub fn has_destination(&self) -> bool {
        !self.uri.trim().is_empty()
    }

    /// Socket address to dial, falling back to the URI authority for a
    /// missing host or a zero port.
    pub fn socket_addr(&self) -> Result<(String, u16)> {
        if !self.has_destination() {
            return Err(ClientError::ConfigurationMissing);
        }
        if !self.host.is_empty() && self.port != 0 {
            return Ok((self.host.clone(), self.port));
        }

        let (uri_host, uri_port) = authority_of(&self.uri)?;
        let host = if self.host.is_empty() { uri_host } else { self.host.clone() };
        let port = if self.port == 0 { uri_port } else { self.port };
        Ok((host, port))
    }
}

fn authority_of(uri: &str) -> Result<(String, u16)> {
    let invalid = |reason: &str| ClientError::InvalidUri {
        uri: uri.to_string(),
        reason: reason.to_string(),
    };

    let parsed = uri.parse::<Uri>().map_err(|e| invalid(&e.to_string()))?;

    let default_port = match parsed.scheme_str() {
        Some("ws") => 80,
        Some("wss") => 443,
        Some(other) => return Err(invalid(&format!("unsupported scheme `{}`", other))),
        None => return Err(invalid("missing scheme")),
    };

    let host = parsed.host().ok_or_else(|| invalid("missing host"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']').to_string();
    let port = parsed.port_u16().unwrap_or(default_port);

    Ok((host, port))
}
