//! GoTrue (Supabase Auth) REST client.
//!
//! Thin HTTP wrapper around `/auth/v1`. Every session it obtains is written
//! to the shared `SessionStore`, which is what mounted screens observe.
//! Response parsing lives in free functions for testability.
//!
//! ERROR HANDLING
//! ==============
//! Non-success responses become `ProviderError::Api` carrying whatever
//! human-readable message GoTrue put in the body, so the screen can show it.

#[cfg(test)]
#[path = "gotrue_test.rs"]
mod gotrue_test;

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Url;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::IdentityProvider;
use super::pkce;
use super::store::{SessionStore, SessionSubscription};
use super::types::{
    AuthChangeEvent, OAuthProvider, OAuthRedirect, OAuthRequest, PasswordCredentials, ProviderError, Session,
    SignUpOutcome, SignUpRequest, User,
};
use crate::config::AuthConfig;

/// Sessions this close to expiry are refreshed before being handed out.
const EXPIRY_MARGIN_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

pub struct GoTrueClient {
    http: reqwest::Client,
    auth_url: String,
    anon_key: String,
    store: Arc<SessionStore>,
    pending_verifier: Mutex<Option<String>>,
}

impl GoTrueClient {
    /// Build a client with its own session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &AuthConfig) -> Result<Self, ProviderError> {
        Self::with_store(config, Arc::new(SessionStore::new()))
    }

    /// Build a client writing into an existing session store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn with_store(config: &AuthConfig, store: Arc<SessionStore>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ProviderError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            auth_url: auth_base_url(&config.supabase_url),
            anon_key: config.anon_key.clone(),
            store,
            pending_verifier: Mutex::new(None),
        })
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    async fn send(&self, request: reqwest::RequestBuilder, bearer: Option<&str>) -> Result<String, ProviderError> {
        let response = request
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer.unwrap_or(self.anon_key.as_str()))
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(ProviderError::Api { status, message: parse_error_message(&text) });
        }
        Ok(text)
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, ProviderError> {
        let url = format!("{}/token", self.auth_url);
        let request = self.http.post(url).query(&[("grant_type", grant_type)]).json(&body);
        let text = self.send(request, None).await?;
        parse_session(&text, now_secs())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, ProviderError> {
        tracing::debug!("refreshing expired session");
        match self
            .token_grant("refresh_token", serde_json::json!({ "refresh_token": refresh_token }))
            .await
        {
            Ok(session) => {
                self.store
                    .set(AuthChangeEvent::TokenRefreshed, Some(session.clone()))
                    .await;
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "session refresh failed; signing out locally");
                self.store.set(AuthChangeEvent::SignedOut, None).await;
                Err(e)
            }
        }
    }
}

#[async_trait::async_trait]
impl IdentityProvider for GoTrueClient {
    fn subscribe_session_changes(&self) -> SessionSubscription {
        self.store.subscribe()
    }

    async fn get_current_session(&self) -> Result<Option<Session>, ProviderError> {
        let Some(session) = self.store.current().await else {
            return Ok(None);
        };
        if !needs_refresh(&session, now_secs()) {
            return Ok(Some(session));
        }
        self.refresh(&session.refresh_token).await.map(Some)
    }

    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, ProviderError> {
        tracing::info!(email = %request.email, "sign-up requested");
        let url = format!("{}/signup", self.auth_url);
        let body = serde_json::json!({
            "email": request.email,
            "password": request.password,
            "data": request.data,
        });
        let http_request = self
            .http
            .post(url)
            .query(&[("redirect_to", request.email_redirect_to.as_str())])
            .json(&body);
        let text = self.send(http_request, None).await?;
        let outcome = parse_signup_response(&text, now_secs())?;
        if let SignUpOutcome::SessionCreated(session) = &outcome {
            self.store
                .set(AuthChangeEvent::SignedIn, Some(session.clone()))
                .await;
        }
        Ok(outcome)
    }

    async fn sign_in_with_password(&self, credentials: PasswordCredentials) -> Result<Session, ProviderError> {
        tracing::info!(email = %credentials.email, "password sign-in requested");
        let session = self
            .token_grant(
                "password",
                serde_json::json!({ "email": credentials.email, "password": credentials.password }),
            )
            .await?;
        self.store
            .set(AuthChangeEvent::SignedIn, Some(session.clone()))
            .await;
        Ok(session)
    }

    async fn sign_in_with_oauth(&self, request: OAuthRequest) -> Result<OAuthRedirect, ProviderError> {
        tracing::info!(provider = %request.provider, "oauth sign-in requested");
        let settings = self
            .send(self.http.get(format!("{}/settings", self.auth_url)), None)
            .await?;
        if !provider_enabled(&settings, request.provider)? {
            return Err(ProviderError::UnsupportedProvider(request.provider.to_string()));
        }

        let verifier = pkce::generate_verifier();
        let challenge = pkce::challenge_for(&verifier);
        let url = authorize_url(&self.auth_url, request.provider, &request.redirect_to, &challenge)?;
        *self.pending_verifier.lock().await = Some(verifier);

        Ok(OAuthRedirect { provider: request.provider, url })
    }

    async fn exchange_code_for_session(&self, auth_code: &str) -> Result<Session, ProviderError> {
        let verifier = self
            .pending_verifier
            .lock()
            .await
            .take()
            .ok_or(ProviderError::MissingCodeVerifier)?;
        let session = self
            .token_grant("pkce", serde_json::json!({ "auth_code": auth_code, "code_verifier": verifier }))
            .await?;
        tracing::info!("oauth code exchanged for session");
        self.store
            .set(AuthChangeEvent::SignedIn, Some(session.clone()))
            .await;
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Some(session) = self.store.current().await {
            let request = self.http.post(format!("{}/logout", self.auth_url));
            match self.send(request, Some(session.access_token.as_str())).await {
                // Token already revoked or unknown upstream; still clear locally.
                Ok(_) | Err(ProviderError::Api { status: 401 | 403 | 404, .. }) => {}
                Err(e) => return Err(e),
            }
        }
        self.store.set(AuthChangeEvent::SignedOut, None).await;
        tracing::info!("signed out");
        Ok(())
    }
}

// =============================================================================
// PURE HELPERS
// =============================================================================

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

pub(crate) fn auth_base_url(supabase_url: &str) -> String {
    format!("{}/auth/v1", supabase_url.trim_end_matches('/'))
}

pub(crate) fn needs_refresh(session: &Session, now: u64) -> bool {
    match session.expires_at {
        Some(expires_at) => !session.refresh_token.is_empty() && expires_at <= now + EXPIRY_MARGIN_SECS,
        None => false,
    }
}

/// Build the browser URL that starts the OAuth dance.
pub(crate) fn authorize_url(
    auth_url: &str,
    provider: OAuthProvider,
    redirect_to: &str,
    challenge: &str,
) -> Result<String, ProviderError> {
    let url = Url::parse_with_params(
        &format!("{auth_url}/authorize"),
        &[
            ("provider", provider.as_str()),
            ("redirect_to", redirect_to),
            ("code_challenge", challenge),
            ("code_challenge_method", pkce::CHALLENGE_METHOD),
        ],
    )
    .map_err(|e| ProviderError::Request(format!("invalid authorize url: {e}")))?;
    Ok(url.into())
}

/// Pull a human-readable message out of a GoTrue error body.
pub(crate) fn parse_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["msg", "error_description", "message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .filter(|m| !m.trim().is_empty())
        .map(str::to_owned)
}

/// Parse a token response, filling `expires_at` when GoTrue omitted it.
pub(crate) fn parse_session(body: &str, now: u64) -> Result<Session, ProviderError> {
    let mut session: Session = serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    if session.expires_at.is_none() && session.expires_in > 0 {
        session.expires_at = Some(now + session.expires_in);
    }
    Ok(session)
}

/// `/signup` returns a full session when auto-confirm is on and a bare user
/// when the address still needs confirming.
pub(crate) fn parse_signup_response(body: &str, now: u64) -> Result<SignUpOutcome, ProviderError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    if value.get("access_token").is_some() {
        return parse_session(body, now).map(SignUpOutcome::SessionCreated);
    }
    let user: User = serde_json::from_value(value).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(SignUpOutcome::ConfirmationPending(user))
}

#[derive(Debug, Deserialize)]
struct Settings {
    #[serde(default)]
    external: std::collections::HashMap<String, bool>,
}

/// Whether `/settings` lists the provider as enabled.
pub(crate) fn provider_enabled(settings_body: &str, provider: OAuthProvider) -> Result<bool, ProviderError> {
    let settings: Settings =
        serde_json::from_str(settings_body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    Ok(settings.external.get(provider.as_str()).copied().unwrap_or(false))
}
