//! In-memory credential store
//!
//! Holds the most recently published access token. The token manager is the
//! only writer; every request path is a reader. Readers clone an `Arc` under a
//! short read lock that is never held across an `.await`, so a renewal in
//! progress never blocks a request.
//!
//! Tokens are not persisted: a process restart always starts with a fresh grant.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use common::Secret;
use tokio::time::Instant;
use tracing::debug;

/// A published access token.
///
/// `expires_at` is absolute (monotonic clock), computed from the grant's TTL
/// at the moment the grant was received.
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: Secret<String>,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

impl Credential {
    /// Build a credential issued now with the given lifetime.
    pub fn new(token: Secret<String>, ttl: Duration) -> Self {
        let issued_at = Instant::now();
        Self {
            token,
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    /// Lifetime the token was issued with.
    pub fn ttl(&self) -> Duration {
        self.expires_at.saturating_duration_since(self.issued_at)
    }

    /// When renewal is due: `margin` before expiry.
    pub fn renew_at(&self, margin: Duration) -> Instant {
        self.issued_at + self.ttl().saturating_sub(margin)
    }

    /// Whether the token is past its expiry.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Single-writer, multi-reader holder of the current credential.
#[derive(Debug, Default)]
pub struct CredentialStore {
    current: RwLock<Option<Arc<Credential>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last published credential, or `None` before the first grant.
    pub fn get(&self) -> Option<Arc<Credential>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current credential. Visible to every subsequent `get()`.
    pub fn set(&self, credential: Credential) -> Arc<Credential> {
        let credential = Arc::new(credential);
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&credential));
        debug!(ttl_secs = credential.ttl().as_secs(), "published credential");
        credential
    }

    /// Whether a credential has been published.
    pub fn is_populated(&self) -> bool {
        self.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(token: &str, ttl_secs: u64) -> Credential {
        Credential::new(Secret::from(token), Duration::from_secs(ttl_secs))
    }

    #[test]
    fn empty_before_first_publish() {
        let store = CredentialStore::new();
        assert!(store.get().is_none());
        assert!(!store.is_populated());
    }

    #[tokio::test]
    async fn set_is_visible_to_next_get() {
        let store = CredentialStore::new();
        store.set(credential("at_1", 3600));
        assert_eq!(store.get().unwrap().token.expose_str(), "at_1");

        store.set(credential("at_2", 3600));
        assert_eq!(store.get().unwrap().token.expose_str(), "at_2");
    }

    #[tokio::test]
    async fn reader_keeps_its_snapshot_after_replace() {
        let store = CredentialStore::new();
        store.set(credential("old", 3600));
        let held = store.get().unwrap();

        store.set(credential("new", 3600));

        assert_eq!(held.token.expose_str(), "old");
        assert_eq!(store.get().unwrap().token.expose_str(), "new");
    }

    #[tokio::test(start_paused = true)]
    async fn renew_at_subtracts_margin_from_ttl() {
        let cred = credential("t", 3600);
        assert_eq!(cred.ttl(), Duration::from_secs(3600));
        assert_eq!(
            cred.renew_at(Duration::from_secs(600)),
            cred.issued_at + Duration::from_secs(3000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_tracks_monotonic_clock() {
        let cred = credential("t", 60);
        assert!(!cred.is_expired());
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(cred.is_expired());
    }

    #[tokio::test]
    async fn concurrent_readers_with_single_writer() {
        let store = Arc::new(CredentialStore::new());
        store.set(credential("at_0", 3600));

        let mut readers = vec![];
        for _ in 0..8 {
            let store = Arc::clone(&store);
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let token = store.get().unwrap().token.expose_str().to_owned();
                    assert!(token.starts_with("at_"), "torn read: {token}");
                    tokio::task::yield_now().await;
                }
            }));
        }

        for i in 1..=50 {
            store.set(credential(&format!("at_{i}"), 3600));
            tokio::task::yield_now().await;
        }

        for r in readers {
            r.await.unwrap();
        }
        assert_eq!(store.get().unwrap().token.expose_str(), "at_50");
    }
}
