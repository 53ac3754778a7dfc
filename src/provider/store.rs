//! Session store shared by every mounted screen.
//!
//! DESIGN
//! ======
//! The current session lives behind an `RwLock`; every transition is also
//! broadcast so subscribers see sign-ins that happen while they are mounted.
//! Subscriptions are plain broadcast receivers, released by dropping them.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use tokio::sync::{RwLock, broadcast};

use super::types::{AuthChangeEvent, Session, SessionChange};

const CHANNEL_CAPACITY: usize = 16;

pub struct SessionStore {
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionChange>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { current: RwLock::new(None), events }
    }

    /// Snapshot of the current session.
    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// Replace the current session and notify subscribers.
    pub async fn set(&self, event: AuthChangeEvent, session: Option<Session>) {
        *self.current.write().await = session.clone();
        let delivered = self.events.send(SessionChange { event, session }).unwrap_or(0);
        tracing::debug!(?event, delivered, "session change broadcast");
    }

    /// Register for session-change notifications.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription { rx: self.events.subscribe() }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a session-change subscription. Dropping it unsubscribes.
pub struct SessionSubscription {
    rx: broadcast::Receiver<SessionChange>,
}

impl SessionSubscription {
    /// Wait for the next notification. Returns `None` once the provider is gone.
    ///
    /// A slow subscriber that falls behind skips the missed notifications;
    /// only the latest state matters to the screen.
    pub async fn next(&mut self) -> Option<SessionChange> {
        loop {
            match self.rx.recv().await {
                Ok(change) => return Some(change),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "session subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Release the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}
