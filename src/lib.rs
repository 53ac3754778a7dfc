//! CodeSpace auth screen — session synchronization between the sign-in screen
//! and the identity provider.
//!
//! ARCHITECTURE
//! ============
//! `provider` talks to the identity service and owns the session store.
//! `screen` holds the two pieces mounted on the auth page: the session
//! watcher (redirects once a session exists) and the form controller (drives
//! password and OAuth requests). `nav` and `notify` are the seams the host
//! UI implements.

pub mod config;
pub mod nav;
pub mod notify;
pub mod provider;
pub mod screen;
pub mod state;

#[cfg(test)]
pub mod test_helpers;
