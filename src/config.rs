//! Auth configuration parsed from environment variables.

pub const DEFAULT_APP_ORIGIN: &str = "http://localhost:8080";
pub const DEFAULT_AUTH_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_AUTH_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for AuthTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_AUTH_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_AUTH_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Base URL of the Supabase project (without `/auth/v1`).
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: String,
    /// Origin the app is served from; redirect targets are built on it.
    pub app_origin: String,
    pub timeouts: AuthTimeouts,
}

impl AuthConfig {
    /// Build typed auth config from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_ANON_KEY`
    ///
    /// Optional:
    /// - `APP_ORIGIN`: default `http://localhost:8080`
    /// - `AUTH_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTH_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a URL is not
    /// `http(s)`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let supabase_url = std::env::var("SUPABASE_URL").map_err(|_| ConfigError::Missing("SUPABASE_URL"))?;
        let anon_key = std::env::var("SUPABASE_ANON_KEY").map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?;
        let app_origin = std::env::var("APP_ORIGIN").unwrap_or_else(|_| DEFAULT_APP_ORIGIN.to_owned());
        let timeouts = AuthTimeouts {
            request_secs: env_parse_u64("AUTH_REQUEST_TIMEOUT_SECS", DEFAULT_AUTH_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("AUTH_CONNECT_TIMEOUT_SECS", DEFAULT_AUTH_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self {
            supabase_url: normalize_base_url("SUPABASE_URL", &supabase_url)?,
            anon_key,
            app_origin: normalize_base_url("APP_ORIGIN", &app_origin)?,
            timeouts,
        })
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid { var, value: raw.to_owned() });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
