//! The auth screen: session watcher plus form controller, mounted together.
//!
//! SYSTEM CONTEXT
//! ==============
//! The host UI mounts one `AuthScreen` per visit to `/auth` and drops it on
//! navigation. Both halves share the injected provider; neither touches
//! process-wide state.


pub mod form;
pub mod watcher;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;

pub use form::{AuthFormController, PendingRequest, RequestOutcome};
pub use watcher::SessionWatcher;

use crate::config::AuthConfig;
use crate::nav::{EDITOR_ROUTE, Navigator, callback_url};
use crate::notify::Notifier;
use crate::provider::IdentityProvider;
use crate::state::auth_form::AuthMode;

/// Collaborators injected into a mounted screen.
#[derive(Clone)]
pub struct ScreenDeps {
    pub provider: Arc<dyn IdentityProvider>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
    /// Origin used to build provider callback URLs.
    pub app_origin: String,
    pub request_timeout: Duration,
}

impl ScreenDeps {
    #[must_use]
    pub fn from_config(
        config: &AuthConfig,
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            provider,
            navigator,
            notifier,
            app_origin: config.app_origin.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        }
    }
}

pub struct AuthScreen {
    pub watcher: SessionWatcher,
    pub form: AuthFormController,
}

impl AuthScreen {
    /// Mount the screen at `location`; the `mode` query parameter picks the
    /// initial form mode.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(deps: ScreenDeps, location: &Url) -> Self {
        let mode = AuthMode::from_location(location);
        tracing::debug!(?mode, "auth screen mounted");

        let watcher = SessionWatcher::mount(Arc::clone(&deps.provider), Arc::clone(&deps.navigator), EDITOR_ROUTE);
        let form = AuthFormController::new(
            mode,
            deps.provider,
            deps.navigator,
            deps.notifier,
            callback_url(&deps.app_origin, EDITOR_ROUTE),
            deps.request_timeout,
        );
        Self { watcher, form }
    }

    /// Tear down both halves: the subscription is released and any request
    /// still in flight will be discarded when it settles.
    pub fn unmount(self) {
        drop(self);
    }
}
