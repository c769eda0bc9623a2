//! Cross-tab signal bus
//!
//! Every tab opened against the same store shares one bus. Delivery is
//! best effort: a receiver that falls behind loses the oldest signals.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionSignal {
    /// The shared credential store changed
    StorageChanged { source: String },
    /// Something signed in or out; re-derive the identity view
    AuthStateChanged { source: String, authenticated: bool },
    SessionInvalidated { source: String, message: String },
    UserBanned { source: String, message: String },
}

impl SessionSignal {
    /// Id of the tab that emitted the signal
    pub fn source(&self) -> &str {
        match self {
            SessionSignal::StorageChanged { source }
            | SessionSignal::AuthStateChanged { source, .. }
            | SessionSignal::SessionInvalidated { source, .. }
            | SessionSignal::UserBanned { source, .. } => source,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionSignal::StorageChanged { .. } => "storage",
            SessionSignal::AuthStateChanged { .. } => "authStateChanged",
            SessionSignal::SessionInvalidated { .. } => "session_invalidated",
            SessionSignal::UserBanned { .. } => "user_banned",
        }
    }
}

#[derive(Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<SessionSignal>,
}

impl SignalBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to every subscribed tab. Having no subscribers is fine.
    pub fn publish(&self, signal: SessionSignal) {
        let name = signal.name();
        match self.sender.send(signal) {
            Ok(receivers) => tracing::debug!(signal = name, receivers, "Published session signal"),
            Err(_) => tracing::trace!(signal = name, "No subscribers for session signal"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionSignal> {
        self.sender.subscribe()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}
