//! Connection module
//!
//! This module handles the outbound WebSocket session: connection options,
//! the message envelope, the inbound observer and the client itself.

pub mod observer;
pub mod options;
pub mod protocol;
pub mod websocket;
