//! Routing seam between the auth screen and the host UI.

#[cfg(test)]
#[path = "nav_test.rs"]
mod nav_test;

/// Authenticated landing page (the editor).
pub const EDITOR_ROUTE: &str = "/editor";
/// The sign-in / sign-up screen.
pub const AUTH_ROUTE: &str = "/auth";

/// Host-provided navigation.
pub trait Navigator: Send + Sync {
    /// In-app route change.
    fn navigate(&self, route: &str);

    /// Full-page redirect to an external URL (OAuth authorize page).
    fn redirect_external(&self, url: &str);
}

/// Absolute URL for an in-app route, used as a provider callback target.
#[must_use]
pub fn callback_url(app_origin: &str, route: &str) -> String {
    format!("{}{route}", app_origin.trim_end_matches('/'))
}
