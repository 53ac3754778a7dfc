//! Transient auth-form state for the sign-in / sign-up screen.
//!
//! DESIGN
//! ======
//! Plain data plus pure validation. The controller in `screen::form` owns
//! the only live instance and is the only writer; nothing here performs I/O.

#[cfg(test)]
#[path = "auth_form_test.rs"]
mod auth_form_test;

use reqwest::Url;

use crate::provider::PasswordCredentials;

/// Identity providers reject shorter passwords; checked locally first.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Which flow the form submits to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

impl AuthMode {
    /// Map the `mode` query parameter: `signup` selects sign-up, anything
    /// else (or nothing) selects sign-in.
    #[must_use]
    pub fn from_param(mode: Option<&str>) -> Self {
        match mode {
            Some("signup") => Self::SignUp,
            _ => Self::SignIn,
        }
    }

    /// Read the initial mode from the page location's query string.
    #[must_use]
    pub fn from_location(location: &Url) -> Self {
        let mode = location
            .query_pairs()
            .find(|(key, _)| key == "mode")
            .map(|(_, value)| value.into_owned());
        Self::from_param(mode.as_deref())
    }

    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::SignIn => Self::SignUp,
            Self::SignUp => Self::SignIn,
        }
    }
}

/// Form inputs that can hold focus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Name,
    Email,
    Password,
}

/// Everything the auth form renders from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthFormState {
    pub mode: AuthMode,
    pub name: String,
    pub email: String,
    pub password: String,
    pub submitting: bool,
    pub focused_field: Option<Field>,
    pub password_visible: bool,
}

/// Why a submission was refused before reaching the provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejected {
    #[error("a request is already in flight")]
    AlreadySubmitting,
    #[error("name is required")]
    NameRequired,
    #[error("email is required")]
    EmailRequired,
    #[error("enter a valid email address")]
    EmailInvalid,
    #[error("password is required")]
    PasswordRequired,
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
}

impl AuthFormState {
    #[must_use]
    pub fn new(mode: AuthMode) -> Self {
        Self { mode, ..Self::default() }
    }

    /// Check the form can be submitted and extract the credentials.
    ///
    /// # Errors
    ///
    /// Returns the first local rule the form breaks.
    pub fn validate(&self) -> Result<PasswordCredentials, SubmitRejected> {
        if self.submitting {
            return Err(SubmitRejected::AlreadySubmitting);
        }
        if self.mode == AuthMode::SignUp && self.name.trim().is_empty() {
            return Err(SubmitRejected::NameRequired);
        }
        if self.email.is_empty() {
            return Err(SubmitRejected::EmailRequired);
        }
        if !looks_like_email(&self.email) {
            return Err(SubmitRejected::EmailInvalid);
        }
        if self.password.is_empty() {
            return Err(SubmitRejected::PasswordRequired);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(SubmitRejected::PasswordTooShort { min: MIN_PASSWORD_LEN });
        }
        Ok(PasswordCredentials { email: self.email.clone(), password: self.password.clone() })
    }
}

/// `local@domain` with no whitespace; the provider does the real check.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}
