//! Pre-auth nonce store: short-lived server-side mapping from the `state`
//! nonce to the pre-login context (requested URL, PKCE verifier/challenge).
//!
//! A state is redeemable at most once: [`NonceStore::take`] is destructive.
//! Entries expire after the login-flow TTL and are dropped by a periodic
//! sweep.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::{RngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Context captured at `/login`, redeemed at `/auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginState {
    pub requested_url: String,
    pub code_verifier: Option<String>,
    pub code_challenge: Option<String>,
}

struct Entry {
    state: LoginState,
    created_at: Instant,
}

pub struct NonceStore {
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl NonceStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn put(&self, nonce: String, state: LoginState) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            nonce,
            Entry {
                state,
                created_at: Instant::now(),
            },
        );
    }

    /// Redeem a nonce. Destructive: a second call for the same nonce, or a
    /// call after the TTL elapsed, returns `None`.
    pub async fn take(&self, nonce: &str) -> Option<LoginState> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(nonce)?;
        if entry.created_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.state)
    }

    /// Drop expired entries. Called periodically by the sweeper task.
    pub async fn sweep(&self) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Fresh `state` nonce: 32 bytes from the OS RNG, base64url encoded.
///
/// # Errors
///
/// Returns an error when the OS RNG fails.
pub fn generate_state() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate state nonce")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// PKCE code verifier: 32 random bytes, base64url encoded to 43 characters
/// (within the 43..=128 range RFC 7636 requires).
///
/// # Errors
///
/// Returns an error when the OS RNG fails.
pub fn generate_code_verifier() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate PKCE verifier")?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// `S256` code challenge for a verifier: `base64url(sha256(verifier))`.
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
