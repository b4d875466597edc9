//! Client State Management
//!
//! Provides the client lifecycle state machine and a thread-safe manager so
//! that concurrent `start`/`close` calls observe a single consistent state.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

/// Maximum number of transitions kept in the history
const TRANSITION_HISTORY: usize = 100;

/// Represents the possible lifecycle states of the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Never started, or the last connect attempt failed
    Idle,
    /// `start()` is connecting or the session is running
    Started,
    /// The session was closed
    Closed,
}

impl std::fmt::Display for ClientState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientState::Idle => write!(f, "Idle"),
            ClientState::Started => write!(f, "Started"),
            ClientState::Closed => write!(f, "Closed"),
        }
    }
}

/// State transition information
#[derive(Debug, Clone)]
pub struct StateTransition {
    pub from: ClientState,
    pub to: ClientState,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

struct ClientStateInner {
    current: ClientState,
    started_at: Option<DateTime<Utc>>,
    sessions: u32,
    transitions: Vec<StateTransition>,
}

/// Thread-safe client state manager
#[derive(Clone)]
pub struct ClientStateManager {
    inner: Arc<RwLock<ClientStateInner>>,
}

impl ClientStateManager {
    /// Create a new state manager starting in Idle state
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ClientStateInner {
                current: ClientState::Idle,
                started_at: None,
                sessions: 0,
                transitions: Vec::new(),
            })),
        }
    }

    /// Get the current state
    pub fn current_state(&self) -> ClientState {
        self.inner.read().current
    }

    /// When the client last entered the Started state
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().started_at
    }

    /// Number of times the client has been started
    pub fn sessions(&self) -> u32 {
        self.inner.read().sessions
    }

    /// Atomically move to Started unless the client is already started.
    ///
    /// Returns the session number on success and `None` without touching the
    /// state when another `start()` holds it.
    pub fn try_start(&self) -> Option<u32> {
        let mut inner = self.inner.write();
        if inner.current == ClientState::Started {
            return None;
        }
        Self::apply(&mut inner, ClientState::Started, Some("Start requested".to_string()));
        Some(inner.sessions)
    }

    /// Whether `session` is the one currently holding the Started state
    pub fn is_current(&self, session: u32) -> bool {
        let inner = self.inner.read();
        inner.current == ClientState::Started && inner.sessions == session
    }

    /// Leave the Started state on behalf of `session`.
    ///
    /// Does nothing if the session was already closed or superseded.
    pub fn end_session(&self, session: u32, to: ClientState, reason: Option<String>) -> bool {
        let mut inner = self.inner.write();
        if inner.current != ClientState::Started || inner.sessions != session {
            return false;
        }
        if !Self::is_valid_transition(inner.current, to) {
            return false;
        }
        Self::apply(&mut inner, to, reason);
        true
    }

    /// Transition to a new state
    pub fn transition_to(&self, new_state: ClientState, reason: Option<String>) -> bool {
        let mut inner = self.inner.write();

        if !Self::is_valid_transition(inner.current, new_state) {
            tracing::debug!(
                from = %inner.current,
                to = %new_state,
                "Rejected client state transition"
            );
            return false;
        }

        Self::apply(&mut inner, new_state, reason);
        true
    }

    fn apply(inner: &mut ClientStateInner, new_state: ClientState, reason: Option<String>) {
        let old_state = inner.current;
        inner.current = new_state;

        if new_state == ClientState::Started && old_state != ClientState::Started {
            inner.started_at = Some(Utc::now());
            inner.sessions += 1;
        }

        inner.transitions.push(StateTransition {
            from: old_state,
            to: new_state,
            timestamp: Utc::now(),
            reason,
        });

        if inner.transitions.len() > TRANSITION_HISTORY {
            inner.transitions.remove(0);
        }

        tracing::info!(
            from = %old_state,
            to = %new_state,
            sessions = inner.sessions,
            "Client state transition"
        );
    }

    fn is_valid_transition(from: ClientState, to: ClientState) -> bool {
        // Self-transition is always allowed
        if from == to {
            return true;
        }

        matches!(
            (from, to),
            (ClientState::Idle, ClientState::Started) |
            // Connect failed
            (ClientState::Started, ClientState::Idle) |
            (ClientState::Started, ClientState::Closed) |
            (ClientState::Closed, ClientState::Started)
        )
    }

    /// Set state to closed
    pub fn set_closed(&self, reason: Option<String>) {
        self.transition_to(ClientState::Closed, reason);
    }

    /// Get recent state transitions, newest first
    pub fn recent_transitions(&self, count: usize) -> Vec<StateTransition> {
        let inner = self.inner.read();
        inner.transitions.iter().rev().take(count).cloned().collect()
    }

    /// Check if the client is started
    pub fn is_started(&self) -> bool {
        self.current_state() == ClientState::Started
    }
}

impl Default for ClientStateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let manager = ClientStateManager::new();
        assert_eq!(manager.current_state(), ClientState::Idle);
        assert!(!manager.is_started());
        assert!(manager.started_at().is_none());
    }

    #[test]
    fn test_try_start_is_exclusive() {
        let manager = ClientStateManager::new();

        assert_eq!(manager.try_start(), Some(1));
        assert_eq!(manager.try_start(), None);
        assert_eq!(manager.current_state(), ClientState::Started);
        assert_eq!(manager.sessions(), 1);
    }

    #[test]
    fn test_restart_after_close() {
        let manager = ClientStateManager::new();

        assert_eq!(manager.try_start(), Some(1));
        manager.set_closed(None);
        assert_eq!(manager.current_state(), ClientState::Closed);

        assert_eq!(manager.try_start(), Some(2));
        assert_eq!(manager.sessions(), 2);
    }

    #[test]
    fn test_connect_failure_returns_to_idle() {
        let manager = ClientStateManager::new();

        let session = manager.try_start().unwrap();
        assert!(manager.end_session(session, ClientState::Idle, Some("refused".to_string())));
        assert_eq!(manager.current_state(), ClientState::Idle);
    }

    #[test]
    fn test_stale_session_cannot_end_newer_one() {
        let manager = ClientStateManager::new();

        let first = manager.try_start().unwrap();
        manager.set_closed(None);
        let second = manager.try_start().unwrap();

        assert!(!manager.is_current(first));
        assert!(manager.is_current(second));
        assert!(!manager.end_session(first, ClientState::Closed, None));
        assert_eq!(manager.current_state(), ClientState::Started);

        assert!(manager.end_session(second, ClientState::Closed, None));
        assert_eq!(manager.current_state(), ClientState::Closed);
    }

    #[test]
    fn test_invalid_transitions() {
        let manager = ClientStateManager::new();

        assert!(!manager.transition_to(ClientState::Closed, None));
        assert_eq!(manager.current_state(), ClientState::Idle);

        manager.try_start();
        manager.set_closed(None);
        assert!(!manager.transition_to(ClientState::Idle, None));
        assert_eq!(manager.current_state(), ClientState::Closed);
    }

    #[test]
    fn test_recent_transitions_newest_first() {
        let manager = ClientStateManager::new();

        manager.try_start();
        manager.set_closed(Some("done".to_string()));

        let transitions = manager.recent_transitions(10);
        assert_eq!(transitions.len(), 2);
        assert_eq!(transitions[0].to, ClientState::Closed);
        assert_eq!(transitions[0].reason.as_deref(), Some("done"));
        assert_eq!(transitions[1].from, ClientState::Idle);
    }

    #[test]
    fn test_transition_history_is_bounded() {
        let manager = ClientStateManager::new();

        for _ in 0..80 {
            manager.try_start();
            manager.set_closed(None);
        }

        assert_eq!(manager.recent_transitions(usize::MAX).len(), TRANSITION_HISTORY);
    }
}
