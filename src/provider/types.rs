//! Identity-provider types — sessions, change events, requests, and errors.
//!
//! Wire shapes follow the GoTrue (Supabase Auth) REST API so the same types
//! serve the HTTP client and in-memory fakes.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by identity-provider operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("auth request failed: {0}")]
    Request(String),

    /// The provider answered with a non-success status.
    #[error("auth response error: status {status}")]
    Api { status: u16, message: Option<String> },

    /// The provider response body could not be deserialized.
    #[error("auth response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The named OAuth provider is not enabled on the identity service.
    #[error("Unsupported provider: {0} is not enabled")]
    UnsupportedProvider(String),

    /// A PKCE code exchange was attempted without a pending verifier.
    #[error("no pending OAuth sign-in to complete")]
    MissingCodeVerifier,

    /// The request did not settle within the configured timeout.
    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl ProviderError {
    /// User-facing message reported by the provider, if it gave one.
    ///
    /// Transport-level failures carry no provider message; callers fall back
    /// to their own generic text.
    #[must_use]
    pub fn provider_message(&self) -> Option<String> {
        match self {
            Self::Api { message, .. } => message.clone().filter(|m| !m.trim().is_empty()),
            Self::UnsupportedProvider(_) | Self::MissingCodeVerifier | Self::Timeout { .. } => Some(self.to_string()),
            Self::Request(_) | Self::Parse(_) | Self::HttpClientBuild(_) => None,
        }
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Authenticated user as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl User {
    /// Display name stored in user metadata at sign-up.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata.get("name").and_then(serde_json::Value::as_str)
    }
}

/// Server-issued proof of authentication. Opaque to the screen apart from
/// whether it carries a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub expires_at: Option<u64>,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

fn default_token_type() -> String {
    "bearer".to_owned()
}

impl Session {
    /// True when the session belongs to a signed-in user.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.user.is_some()
    }
}

// =============================================================================
// CHANGE EVENTS
// =============================================================================

/// Kinds of session transitions broadcast by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthChangeEvent {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
    PasswordRecovery,
}

/// One session-change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionChange {
    pub event: AuthChangeEvent,
    pub session: Option<Session>,
}

impl SessionChange {
    /// The signed-in user carried by this notification, if any.
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().and_then(|s| s.user.as_ref())
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCredentials {
    pub email: String,
    pub password: String,
}

/// Account-creation request.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    /// Where the confirmation email should send the user back to.
    pub email_redirect_to: String,
    /// Arbitrary user metadata (`{"name": ...}`).
    pub data: serde_json::Value,
}

/// Result of a successful sign-up.
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The service auto-confirmed the account and issued a session.
    SessionCreated(Session),
    /// The account exists but a confirmation email must be followed first.
    ConfirmationPending(User),
}

/// External identity providers offered on the auth screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    GitHub,
    Google,
}

impl OAuthProvider {
    /// Provider slug as understood by the identity service.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Google => "google",
        }
    }
}

impl std::str::FromStr for OAuthProvider {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "github" => Ok(Self::GitHub),
            "google" => Ok(Self::Google),
            other => Err(ProviderError::UnsupportedProvider(other.to_owned())),
        }
    }
}

impl std::fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRequest {
    pub provider: OAuthProvider,
    pub redirect_to: String,
}

/// Where the browser must go to continue an OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRedirect {
    pub provider: OAuthProvider,
    pub url: String,
}
