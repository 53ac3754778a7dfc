//! PKCE helpers for the OAuth redirect flow.
//!
//! The verifier stays in the client; only its S256 challenge travels in the
//! authorize URL. The verifier is presented again when the callback code is
//! exchanged for a session.

#[cfg(test)]
#[path = "pkce_test.rs"]
mod pkce_test;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Challenge method name sent alongside the challenge.
pub const CHALLENGE_METHOD: &str = "s256";

/// Generate a random 56-byte verifier rendered as 112 hex characters
/// (within the 43..=128 range RFC 7636 allows).
#[must_use]
pub fn generate_verifier() -> String {
    let bytes: [u8; 56] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// S256 challenge: base64url(sha256(verifier)) without padding.
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
