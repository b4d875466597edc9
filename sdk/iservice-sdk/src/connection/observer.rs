//! Inbound Observer
//!
//! The single consumer notified of everything the remote endpoint sends.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Receives inbound frames and session lifecycle notifications.
///
/// Exactly one observer is attached to a client, at construction time.
#[async_trait]
pub trait MessageObserver: Send + Sync + 'static {
    /// Called once the channel is established and `is_ready()` holds
    async fn on_open(&self, _session_id: Uuid) {}

    /// Called for every inbound text frame
    async fn on_message(&self, text: &str);

    /// Called after the session ended, whatever the cause
    async fn on_close(&self, _session_id: Uuid) {}
}

/// Observer that only logs what it receives
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

#[async_trait]
impl MessageObserver for LoggingObserver {
    async fn on_open(&self, session_id: Uuid) {
        info!(session_id = %session_id, "Session opened");
    }

    async fn on_message(&self, text: &str) {
        info!(len = text.len(), message = %text, "Received message");
    }

    async fn on_close(&self, session_id: Uuid) {
        debug!(session_id = %session_id, "Session closed");
    }
}

/// Event forwarded by [`ChannelObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Opened(Uuid),
    Message(String),
    Closed(Uuid),
}

/// Observer that forwards every notification into an mpsc channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: ClientEvent) {
        if self.tx.send(event).is_err() {
            debug!("Event receiver dropped, discarding event");
        }
    }
}

#[async_trait]
impl MessageObserver for ChannelObserver {
    async fn on_open(&self, session_id: Uuid) {
        self.forward(ClientEvent::Opened(session_id));
    }

    async fn on_message(&self, text: &str) {
        self.forward(ClientEvent::Message(text.to_string()));
    }

    async fn on_close(&self, session_id: Uuid) {
        self.forward(ClientEvent::Closed(session_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_observer_forwards_in_order() {
        let (observer, mut rx) = ChannelObserver::new();
        let id = Uuid::new_v4();

        observer.on_open(id).await;
        observer.on_message("first").await;
        observer.on_close(id).await;

        assert_eq!(rx.recv().await, Some(ClientEvent::Opened(id)));
        assert_eq!(rx.recv().await, Some(ClientEvent::Message("first".to_string())));
        assert_eq!(rx.recv().await, Some(ClientEvent::Closed(id)));
    }

    #[tokio::test]
    async fn test_channel_observer_survives_dropped_receiver() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);

        observer.on_message("ignored").await;
    }
}
