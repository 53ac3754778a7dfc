//! Session watcher — keeps a signed-in user off the auth screen.
//!
//! DESIGN
//! ======
//! Two independent listeners feed one idempotent `ensure_navigated`:
//! the session-change subscription and a one-time current-session query.
//! Either may observe the session first (an OAuth redirect can land before
//! or after mount), so neither is treated as authoritative.
//!
//! LIFECYCLE
//! =========
//! `mount` acquires the subscription; dropping the watcher clears the mounted
//! flag and aborts both listeners, which releases the subscription. A query
//! that resolves after teardown is ignored.

#[cfg(test)]
#[path = "watcher_test.rs"]
mod watcher_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

use crate::nav::Navigator;
use crate::provider::IdentityProvider;

struct WatchShared {
    mounted: AtomicBool,
    navigated: AtomicBool,
    navigator: Arc<dyn Navigator>,
    target: String,
}

impl WatchShared {
    fn ensure_navigated(&self, source: &'static str) {
        if !self.mounted.load(Ordering::Acquire) {
            tracing::debug!(source, "session observed after teardown; ignoring");
            return;
        }
        if self
            .navigated
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        tracing::info!(route = %self.target, source, "active session; leaving auth screen");
        self.navigator.navigate(&self.target);
    }
}

pub struct SessionWatcher {
    shared: Arc<WatchShared>,
    listeners: Vec<JoinHandle<()>>,
}

impl SessionWatcher {
    /// Subscribe to session changes and query the current session.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(provider: Arc<dyn IdentityProvider>, navigator: Arc<dyn Navigator>, target: &str) -> Self {
        let shared = Arc::new(WatchShared {
            mounted: AtomicBool::new(true),
            navigated: AtomicBool::new(false),
            navigator,
            target: target.to_owned(),
        });

        let mut subscription = provider.subscribe_session_changes();
        let changes = tokio::spawn({
            let shared = Arc::clone(&shared);
            async move {
                while let Some(change) = subscription.next().await {
                    tracing::debug!(event = ?change.event, "session change");
                    if change.user().is_some() {
                        shared.ensure_navigated("notification");
                    }
                }
            }
        });

        let initial = tokio::spawn({
            let shared = Arc::clone(&shared);
            async move {
                match provider.get_current_session().await {
                    Ok(Some(session)) if session.is_active() => shared.ensure_navigated("initial query"),
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "current session query failed"),
                }
            }
        });

        Self { shared, listeners: vec![changes, initial] }
    }

    /// Whether this mount has already redirected.
    #[must_use]
    pub fn has_navigated(&self) -> bool {
        self.shared.navigated.load(Ordering::Acquire)
    }

    /// Tear down the watcher. Equivalent to dropping it.
    pub fn unmount(self) {
        drop(self);
    }
}

impl Drop for SessionWatcher {
    fn drop(&mut self) {
        self.shared.mounted.store(false, Ordering::Release);
        for listener in &self.listeners {
            listener.abort();
        }
        tracing::debug!("session watcher unmounted");
    }
}
