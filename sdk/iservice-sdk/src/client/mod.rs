//! Client module
//!
//! Lifecycle bookkeeping for the WebSocket client.

pub mod state;
