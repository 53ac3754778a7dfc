//! Auth form controller — turns form input into provider requests.
//!
//! DESIGN
//! ======
//! The controller is the sole strong owner of `AuthFormState`. Each request
//! runs in its own task holding only a `Weak` to that state, so a request
//! that settles after the screen is gone finds nothing to update and is
//! dropped without touching state or raising a notification.
//!
//! Navigation after a successful password sign-in or sign-up is not done
//! here; the session watcher reacts to the session the provider publishes.

#[cfg(test)]
#[path = "form_test.rs"]
mod form_test;

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::nav::Navigator;
use crate::notify::{Notification, Notifier};
use crate::provider::{IdentityProvider, OAuthProvider, OAuthRequest, ProviderError, SignUpOutcome, SignUpRequest};
use crate::state::auth_form::{AuthFormState, AuthMode, Field, SubmitRejected};

const SUBMIT_FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";
const OAUTH_FALLBACK_MESSAGE: &str = "OAuth sign in failed.";

fn lock(state: &Mutex<AuthFormState>) -> MutexGuard<'_, AuthFormState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// How a dispatched request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Succeeded,
    /// Sign-up accepted; no session until the email address is confirmed.
    ConfirmationPending,
    Failed(ProviderError),
    /// Settled after the screen was torn down; nothing was applied.
    Discarded,
}

/// A request running in the background.
pub struct PendingRequest {
    handle: JoinHandle<RequestOutcome>,
}

impl PendingRequest {
    /// Wait for the request to settle.
    pub async fn settled(self) -> RequestOutcome {
        self.handle.await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "auth request task ended abnormally");
            RequestOutcome::Discarded
        })
    }
}

pub struct AuthFormController {
    state: Arc<Mutex<AuthFormState>>,
    provider: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    redirect_to: String,
    request_timeout: Duration,
}

impl AuthFormController {
    /// `redirect_to` is the absolute URL of the authenticated landing page,
    /// handed to the provider for email confirmation and OAuth callbacks.
    pub fn new(
        mode: AuthMode,
        provider: Arc<dyn IdentityProvider>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        redirect_to: String,
        request_timeout: Duration,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(AuthFormState::new(mode))),
            provider,
            navigator,
            notifier,
            redirect_to,
            request_timeout,
        }
    }

    /// Snapshot for rendering.
    #[must_use]
    pub fn state(&self) -> AuthFormState {
        lock(&self.state).clone()
    }

    /// Whether the submit control should be disabled.
    #[must_use]
    pub fn is_submitting(&self) -> bool {
        lock(&self.state).submitting
    }

    pub fn set_name(&self, value: impl Into<String>) {
        lock(&self.state).name = value.into();
    }

    pub fn set_email(&self, value: impl Into<String>) {
        lock(&self.state).email = value.into();
    }

    pub fn set_password(&self, value: impl Into<String>) {
        lock(&self.state).password = value.into();
    }

    /// Switch between sign-in and sign-up. Field values are kept.
    pub fn toggle_mode(&self) {
        let mut state = lock(&self.state);
        state.mode = state.mode.toggled();
    }

    pub fn focus_field(&self, field: Field) {
        lock(&self.state).focused_field = Some(field);
    }

    pub fn blur_field(&self) {
        lock(&self.state).focused_field = None;
    }

    pub fn toggle_password_visibility(&self) {
        let mut state = lock(&self.state);
        state.password_visible = !state.password_visible;
    }

    /// Submit the form to the provider according to the current mode.
    ///
    /// # Errors
    ///
    /// Returns `SubmitRejected` without contacting the provider when the form
    /// fails local validation or a submission is already in flight.
    pub fn submit_credentials(&self) -> Result<PendingRequest, SubmitRejected> {
        let (mode, credentials, name) = {
            let mut state = lock(&self.state);
            let credentials = state.validate()?;
            state.submitting = true;
            (state.mode, credentials, state.name.clone())
        };

        let provider = Arc::clone(&self.provider);
        let notifier = Arc::clone(&self.notifier);
        let weak = Arc::downgrade(&self.state);
        let redirect_to = self.redirect_to.clone();
        let timeout = self.request_timeout;

        tracing::info!(?mode, email = %credentials.email, "submitting credentials");
        let handle = tokio::spawn(async move {
            let result = with_timeout(timeout, async {
                match mode {
                    AuthMode::SignUp => {
                        let request = SignUpRequest {
                            email: credentials.email,
                            password: credentials.password,
                            email_redirect_to: redirect_to,
                            data: serde_json::json!({ "name": name }),
                        };
                        provider.sign_up(request).await.map(|outcome| match outcome {
                            SignUpOutcome::SessionCreated(_) => RequestOutcome::Succeeded,
                            SignUpOutcome::ConfirmationPending(_) => {
                                tracing::info!("sign-up awaiting email confirmation");
                                RequestOutcome::ConfirmationPending
                            }
                        })
                    }
                    AuthMode::SignIn => provider
                        .sign_in_with_password(credentials)
                        .await
                        .map(|_| RequestOutcome::Succeeded),
                }
            })
            .await;

            let Some(state) = upgrade(&weak) else {
                return RequestOutcome::Discarded;
            };
            lock(&state).submitting = false;

            match result {
                Ok(outcome) => {
                    notifier.notify(success_notification(mode));
                    outcome
                }
                Err(e) => {
                    tracing::warn!(?mode, error = %e, "credential submission failed");
                    notifier.notify(error_notification(&e, SUBMIT_FALLBACK_MESSAGE));
                    RequestOutcome::Failed(e)
                }
            }
        });

        Ok(PendingRequest { handle })
    }

    /// Start an OAuth sign-in. On success the browser is sent to the
    /// provider's authorize page; there is no local success state.
    pub fn sign_in_with_provider(&self, provider_name: OAuthProvider) -> PendingRequest {
        let provider = Arc::clone(&self.provider);
        let navigator = Arc::clone(&self.navigator);
        let notifier = Arc::clone(&self.notifier);
        let weak = Arc::downgrade(&self.state);
        let request = OAuthRequest { provider: provider_name, redirect_to: self.redirect_to.clone() };
        let timeout = self.request_timeout;

        tracing::info!(provider = %provider_name, "starting oauth sign-in");
        let handle = tokio::spawn(async move {
            let result = with_timeout(timeout, provider.sign_in_with_oauth(request)).await;

            if upgrade(&weak).is_none() {
                return RequestOutcome::Discarded;
            }

            match result {
                Ok(redirect) => {
                    navigator.redirect_external(&redirect.url);
                    RequestOutcome::Succeeded
                }
                Err(e) => {
                    tracing::warn!(provider = %provider_name, error = %e, "oauth sign-in rejected");
                    notifier.notify(error_notification(&e, OAUTH_FALLBACK_MESSAGE));
                    RequestOutcome::Failed(e)
                }
            }
        });

        PendingRequest { handle }
    }
}

fn upgrade(weak: &Weak<Mutex<AuthFormState>>) -> Option<Arc<Mutex<AuthFormState>>> {
    let state = weak.upgrade();
    if state.is_none() {
        tracing::debug!("auth request settled after unmount; discarding result");
    }
    state
}

async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .unwrap_or(Err(ProviderError::Timeout { secs: timeout.as_secs() }))
}

pub(crate) fn success_notification(mode: AuthMode) -> Notification {
    match mode {
        AuthMode::SignUp => {
            Notification::success("Account created!", "Welcome to CodeSpace. Redirecting to the editor...")
        }
        AuthMode::SignIn => Notification::success("Welcome back!", "Successfully signed in."),
    }
}

pub(crate) fn error_notification(error: &ProviderError, fallback: &str) -> Notification {
    Notification::error(error.provider_message().unwrap_or_else(|| fallback.to_owned()))
}
