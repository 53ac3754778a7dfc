//! In-memory fakes for the provider, navigator, and notifier.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::nav::Navigator;
use crate::notify::{Notification, Notifier};
use crate::provider::{
    AuthChangeEvent, IdentityProvider, OAuthRedirect, OAuthRequest, PasswordCredentials, ProviderError, Session,
    SessionStore, SessionSubscription, SignUpOutcome, SignUpRequest, User,
};

/// A session carrying a signed-in user.
#[must_use]
pub fn active_session(token: &str) -> Session {
    Session {
        access_token: token.to_owned(),
        token_type: "bearer".to_owned(),
        expires_in: 3600,
        expires_at: None,
        refresh_token: String::new(),
        user: Some(test_user()),
    }
}

#[must_use]
pub fn test_user() -> User {
    User {
        id: Uuid::nil(),
        email: Some("ada@example.com".to_owned()),
        user_metadata: serde_json::json!({ "name": "Ada" }),
    }
}

/// Let spawned tasks on the current-thread test runtime make progress.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// FAKE PROVIDER
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    GetCurrentSession,
    SignUp(SignUpRequest),
    SignInWithPassword(PasswordCredentials),
    SignInWithOAuth(OAuthRequest),
    ExchangeCode(String),
    SignOut,
}

/// Scriptable identity provider backed by a real `SessionStore`.
///
/// Requests succeed by default. A gated fake holds every request until
/// `release` is called, so tests can observe in-flight state.
pub struct FakeProvider {
    pub store: Arc<SessionStore>,
    calls: Mutex<Vec<ProviderCall>>,
    request_gate: Option<Semaphore>,
    query_gate: Option<Semaphore>,
    sign_up_result: Mutex<Option<Result<SignUpOutcome, ProviderError>>>,
    sign_in_result: Mutex<Option<Result<Session, ProviderError>>>,
    oauth_result: Mutex<Option<Result<OAuthRedirect, ProviderError>>>,
    query_result: Mutex<Option<Result<Option<Session>, ProviderError>>>,
}

impl FakeProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            calls: Mutex::new(Vec::new()),
            request_gate: None,
            query_gate: None,
            sign_up_result: Mutex::new(None),
            sign_in_result: Mutex::new(None),
            oauth_result: Mutex::new(None),
            query_result: Mutex::new(None),
        }
    }

    /// Hold sign-up / sign-in / OAuth requests until `release`.
    #[must_use]
    pub fn gated() -> Self {
        Self { request_gate: Some(Semaphore::new(0)), ..Self::new() }
    }

    /// Hold the current-session query until `release_query`.
    #[must_use]
    pub fn with_gated_query(mut self) -> Self {
        self.query_gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self) {
        if let Some(gate) = &self.request_gate {
            gate.add_permits(1);
        }
    }

    pub fn release_query(&self) {
        if let Some(gate) = &self.query_gate {
            gate.add_permits(1);
        }
    }

    pub fn fail_sign_up(&self, err: ProviderError) {
        *lock(&self.sign_up_result) = Some(Err(err));
    }

    pub fn sign_up_pending_confirmation(&self) {
        *lock(&self.sign_up_result) = Some(Ok(SignUpOutcome::ConfirmationPending(test_user())));
    }

    pub fn fail_sign_in(&self, err: ProviderError) {
        *lock(&self.sign_in_result) = Some(Err(err));
    }

    pub fn fail_oauth(&self, err: ProviderError) {
        *lock(&self.oauth_result) = Some(Err(err));
    }

    pub fn fail_query(&self, err: ProviderError) {
        *lock(&self.query_result) = Some(Err(err));
    }

    /// Simulate a session arriving from elsewhere (OAuth callback, another tab).
    pub async fn emit_signed_in(&self) {
        self.store
            .set(AuthChangeEvent::SignedIn, Some(active_session("emitted")))
            .await;
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.calls).clone()
    }

    /// Calls other than the watcher's current-session query.
    #[must_use]
    pub fn request_calls(&self) -> Vec<ProviderCall> {
        self.calls()
            .into_iter()
            .filter(|c| *c != ProviderCall::GetCurrentSession)
            .collect()
    }

    fn record(&self, call: ProviderCall) {
        lock(&self.calls).push(call);
    }

    async fn pass_gate(gate: Option<&Semaphore>) {
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FakeProvider {
    fn subscribe_session_changes(&self) -> SessionSubscription {
        self.store.subscribe()
    }

    async fn get_current_session(&self) -> Result<Option<Session>, ProviderError> {
        self.record(ProviderCall::GetCurrentSession);
        Self::pass_gate(self.query_gate.as_ref()).await;
        let scripted = lock(&self.query_result).take();
        if let Some(result) = scripted {
            return result;
        }
        Ok(self.store.current().await)
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, ProviderError> {
        self.record(ProviderCall::SignUp(request));
        Self::pass_gate(self.request_gate.as_ref()).await;
        let scripted = lock(&self.sign_up_result).take();
        let outcome = scripted.unwrap_or_else(|| Ok(SignUpOutcome::SessionCreated(active_session("sign-up"))))?;
        if let SignUpOutcome::SessionCreated(session) = &outcome {
            self.store
                .set(AuthChangeEvent::SignedIn, Some(session.clone()))
                .await;
        }
        Ok(outcome)
    }

    async fn sign_in_with_password(&self, credentials: PasswordCredentials) -> Result<Session, ProviderError> {
        self.record(ProviderCall::SignInWithPassword(credentials));
        Self::pass_gate(self.request_gate.as_ref()).await;
        let scripted = lock(&self.sign_in_result).take();
        let session = scripted.unwrap_or_else(|| Ok(active_session("sign-in")))?;
        self.store
            .set(AuthChangeEvent::SignedIn, Some(session.clone()))
            .await;
        Ok(session)
    }

    async fn sign_in_with_oauth(&self, request: OAuthRequest) -> Result<OAuthRedirect, ProviderError> {
        let provider = request.provider;
        let url = format!("https://auth.test/authorize?provider={provider}&redirect_to={}", request.redirect_to);
        self.record(ProviderCall::SignInWithOAuth(request));
        Self::pass_gate(self.request_gate.as_ref()).await;
        let scripted = lock(&self.oauth_result).take();
        scripted.unwrap_or(Ok(OAuthRedirect { provider, url }))
    }

    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session, ProviderError> {
        self.record(ProviderCall::ExchangeCode(auth_code.to_owned()));
        let session = active_session("oauth");
        self.store
            .set(AuthChangeEvent::SignedIn, Some(session.clone()))
            .await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.record(ProviderCall::SignOut);
        self.store.set(AuthChangeEvent::SignedOut, None).await;
        Ok(())
    }
}

// =============================================================================
// RECORDING NAVIGATOR / NOTIFIER
// =============================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        lock(&self.routes).clone()
    }

    #[must_use]
    pub fn redirects(&self) -> Vec<String> {
        lock(&self.redirects).clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        lock(&self.routes).push(route.to_owned());
    }

    fn redirect_external(&self, url: &str) {
        lock(&self.redirects).push(url.to_owned());
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }
}
