//! Notification channel — transient success/error messages shown to the user.

/// Visual weight of a notification.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Severity {
    #[default]
    Default,
    Destructive,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    #[must_use]
    pub fn success(title: &str, description: &str) -> Self {
        Self { title: title.to_owned(), description: description.to_owned(), severity: Severity::Default }
    }

    #[must_use]
    pub fn error(description: impl Into<String>) -> Self {
        Self { title: "Error".to_owned(), description: description.into(), severity: Severity::Destructive }
    }
}

/// Host-provided toast surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}
