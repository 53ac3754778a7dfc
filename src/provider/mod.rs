//! Identity provider — the external service that owns sessions.
//!
//! DESIGN
//! ======
//! The screen only sees the `IdentityProvider` trait so it can run against
//! the GoTrue HTTP client in production and an in-memory fake in tests.
//! Sessions are never constructed by the screen; it observes them through
//! `subscribe_session_changes` and `get_current_session`.

pub mod gotrue;
pub mod pkce;
pub mod store;
pub mod types;

pub use gotrue::GoTrueClient;
pub use store::{SessionStore, SessionSubscription};
pub use types::{
    AuthChangeEvent, OAuthProvider, OAuthRedirect, OAuthRequest, PasswordCredentials, ProviderError, Session,
    SessionChange, SignUpOutcome, SignUpRequest, User,
};

/// Operations the auth screen needs from the identity service.
#[async_trait::async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register for session-change notifications. Drop the handle to release it.
    fn subscribe_session_changes(&self) -> SessionSubscription;

    /// One-time read of the session currently held by the provider.
    async fn get_current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Create an account. A session may or may not be issued immediately.
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, ProviderError>;

    /// Authenticate with email and password.
    async fn sign_in_with_password(&self, credentials: PasswordCredentials) -> Result<Session, ProviderError>;

    /// Prepare an OAuth redirect. Success means the browser should leave the page.
    async fn sign_in_with_oauth(&self, request: OAuthRequest) -> Result<OAuthRedirect, ProviderError>;

    /// Complete an OAuth redirect by trading the callback code for a session.
    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session, ProviderError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), ProviderError>;
}
