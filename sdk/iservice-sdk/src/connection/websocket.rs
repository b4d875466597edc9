//! WebSocket Client
//!
//! Maintains a single outbound WebSocket session. Outgoing payloads are wrapped
//! in a [`WrappedMessage`] and written as JSON text frames; inbound text frames
//! are handed to the client's observer.
//!
//! The session loop is the only writer of the underlying stream. `send()` and
//! `close()` reach it through a command queue, so they can be called from any
//! task while `start()` is driving the session.

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::{
    client_async_tls_with_config, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::client::state::{ClientState, ClientStateManager};
use crate::connection::observer::{LoggingObserver, MessageObserver};
use crate::connection::options::ClientOptions;
use crate::connection::protocol::WrappedMessage;
use crate::error::{ClientError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Instructions for the session loop
enum Command {
    Text(String),
    Close,
}

/// Handle to the live channel held by the client
struct Channel {
    session_id: Uuid,
    commands: mpsc::UnboundedSender<Command>,
    active: Arc<AtomicBool>,
}

impl Channel {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && !self.commands.is_closed()
    }

    fn shutdown(&self) {
        self.active.store(false, Ordering::Release);
        // The loop may already be gone
        let _ = self.commands.send(Command::Close);
    }
}

/// How a call to [`WebSocketClient::start`] ended
#[derive(Debug)]
pub enum StartOutcome {
    /// No destination URI configured; nothing was attempted
    MissingDestination,
    /// The client was already started; no second channel was opened
    AlreadyStarted,
    /// The connection could not be established
    ConnectFailed(ClientError),
    /// A session ran and has now ended
    Closed,
}

/// Single-connection WebSocket client
pub struct WebSocketClient {
    options: ClientOptions,
    observer: Arc<dyn MessageObserver>,
    state: ClientStateManager,
    channel: Mutex<Option<Channel>>,
}

impl WebSocketClient {
    /// Create a new client delivering inbound frames to `observer`
    pub fn new<O: MessageObserver>(options: ClientOptions, observer: O) -> Self {
        Self::with_observer(options, Arc::new(observer))
    }

    /// Create a new client sharing an existing observer
    pub fn with_observer(options: ClientOptions, observer: Arc<dyn MessageObserver>) -> Self {
        Self {
            options,
            observer,
            state: ClientStateManager::new(),
            channel: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Lifecycle state of the client
    pub fn state(&self) -> &ClientStateManager {
        &self.state
    }

    /// Whether `start()` currently holds the client
    pub fn is_started(&self) -> bool {
        self.state.is_started()
    }

    /// Connect and run the session until it ends.
    ///
    /// Returns immediately when no destination is configured or the client is
    /// already started. Connect failures are logged and reported through the
    /// outcome; they never surface as an error.
    pub async fn start(&self) -> StartOutcome {
        if !self.options.has_destination() {
            debug!("No destination URI configured, not starting");
            return StartOutcome::MissingDestination;
        }

        let Some(session) = self.state.try_start() else {
            debug!("Client already started");
            return StartOutcome::AlreadyStarted;
        };

        let session_id = Uuid::new_v4();
        info!(session_id = %session_id, uri = %self.options.uri(), "Connecting");

        let ws_stream = match self.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Connect failed");
                self.state
                    .end_session(session, ClientState::Idle, Some(e.to_string()));
                return StartOutcome::ConnectFailed(e);
            }
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(true));
        {
            let mut channel = self.channel.lock();
            // close() may have run while the handshake was in flight
            if !self.state.is_current(session) {
                info!(session_id = %session_id, "Client closed while connecting, dropping channel");
                return StartOutcome::Closed;
            }
            *channel = Some(Channel {
                session_id,
                commands: command_tx,
                active: active.clone(),
            });
        }

        info!(session_id = %session_id, "WebSocket connection established");
        self.observer.on_open(session_id).await;

        self.run_session(session_id, ws_stream, command_rx).await;

        active.store(false, Ordering::Release);
        {
            let mut channel = self.channel.lock();
            if channel.as_ref().map(|ch| ch.session_id) == Some(session_id) {
                *channel = None;
            }
            self.state
                .end_session(session, ClientState::Closed, Some("Session ended".to_string()));
        }
        self.observer.on_close(session_id).await;

        StartOutcome::Closed
    }

    /// Run the session until it ends or `shutdown` resolves, closing the
    /// client in the latter case.
    pub async fn run_until<F>(&self, shutdown: F) -> StartOutcome
    where
        F: Future<Output = ()>,
    {
        let session = self.start();
        tokio::pin!(session);
        tokio::pin!(shutdown);

        tokio::select! {
            biased;

            outcome = &mut session => outcome,
            () = &mut shutdown => {
                info!("Shutdown requested, closing client");
                self.close();
                session.await
            }
        }
    }

    /// Scoped guard that closes the client when dropped
    pub fn close_guard(self: &Arc<Self>) -> CloseGuard {
        CloseGuard {
            client: Arc::clone(self),
        }
    }

    /// Close the channel. Best effort: the client is no longer started
    /// afterwards whatever state the channel was in.
    pub fn close(&self) {
        let channel = self.channel.lock();

        match channel.as_ref() {
            None => {
                warn!("Client has not started");
                if self.state.is_started() {
                    self.state
                        .set_closed(Some("Closed before the channel opened".to_string()));
                }
                return;
            }
            Some(ch) => {
                if !ch.is_active() {
                    warn!(
                        session_id = %ch.session_id,
                        "Client is not active, it may have closed already"
                    );
                }
                ch.shutdown();
                info!(session_id = %ch.session_id, "Channel closed");
            }
        }

        if self.state.current_state() != ClientState::Idle {
            self.state.set_closed(Some("Close requested".to_string()));
        }
    }

    /// Whether a channel exists and the transport reports it active
    pub fn is_ready(&self) -> bool {
        match self.channel.lock().as_ref() {
            Some(ch) => ch.is_active(),
            None => {
                warn!("Client has not started");
                false
            }
        }
    }

    /// Wrap `payload` in an envelope and queue it as a text frame.
    ///
    /// Delivery is not awaited.
    pub fn send<T: Serialize>(&self, payload: T) -> Result<()> {
        let channel = self.channel.lock();
        let ch = match channel.as_ref() {
            Some(ch) if ch.is_active() => ch,
            Some(_) => return Err(ClientError::ConnectionNotReady),
            None => {
                warn!("Client has not started");
                return Err(ClientError::ConnectionNotReady);
            }
        };

        let json = WrappedMessage::new(payload).to_json()?;
        debug!(session_id = %ch.session_id, len = json.len(), "Queueing message");
        ch.commands
            .send(Command::Text(json))
            .map_err(|_| ClientError::ConnectionNotReady)
    }

    /// Dial the configured host and perform the upgrade handshake
    async fn connect(&self) -> Result<WsStream> {
        let (host, port) = self.options.socket_addr()?;
        let addr = format!("{}:{}", host, port);

        let tcp = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(|source| ClientError::Io {
                addr: addr.clone(),
                source,
            })?;
        if let Err(e) = tcp.set_nodelay(true) {
            debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(self.options.max_message_size());

        let (ws_stream, response) =
            client_async_tls_with_config(self.options.uri(), tcp, Some(config), None).await?;
        debug!(addr = %addr, status = %response.status(), "Handshake completed");

        Ok(ws_stream)
    }

    /// Pump inbound frames to the observer and queued commands to the peer
    async fn run_session(
        &self,
        session_id: Uuid,
        ws_stream: WsStream,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                inbound = read.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            self.observer.on_message(&text).await;
                        }
                        Some(Ok(Message::Binary(data))) => {
                            debug!(len = data.len(), "Received binary message (ignored)");
                        }
                        Some(Ok(Message::Ping(_))) => {
                            debug!("Received ping");
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("Received pong");
                        }
                        Some(Ok(Message::Close(frame))) => {
                            info!(session_id = %session_id, ?frame, "Received close frame");
                            break;
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            error!(session_id = %session_id, error = %e, "WebSocket error");
                            break;
                        }
                        None => {
                            info!(session_id = %session_id, "WebSocket stream ended");
                            break;
                        }
                    }
                }

                command = commands.recv() => {
                    match command {
                        Some(Command::Text(text)) => {
                            if let Err(e) = write.send(Message::Text(text.into())).await {
                                warn!(session_id = %session_id, error = %e, "Failed to write message");
                                break;
                            }
                        }
                        Some(Command::Close) | None => break,
                    }
                }
            }
        }

        if let Err(e) = write.close().await {
            debug!(session_id = %session_id, error = %e, "Close handshake incomplete");
        }
    }
}

/// Closes the client it was created from when dropped
pub struct CloseGuard {
    client: Arc<WebSocketClient>,
}

impl CloseGuard {
    pub fn client(&self) -> &Arc<WebSocketClient> {
        &self.client
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if self.client.is_started() {
            self.client.close();
        }
    }
}

/// Builder for WebSocketClient
pub struct WebSocketClientBuilder {
    options: ClientOptions,
    observer: Option<Arc<dyn MessageObserver>>,
}

impl WebSocketClientBuilder {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            observer: None,
        }
    }

    pub fn observer<O: MessageObserver>(mut self, observer: O) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn build(self) -> WebSocketClient {
        let observer = self
            .observer
            .unwrap_or_else(|| Arc::new(LoggingObserver));
        WebSocketClient::with_observer(self.options, observer)
    }
}
