//! Token lifecycle: initial grant and scheduled renewal
//!
//! State machine:
//! - Unauthenticated → Authenticated (`initialize` publishes the first credential)
//! - Authenticated → Authenticated (each renewal publishes a replacement)
//! - Authenticated → Stopped (cancellation, or a failed renewal)
//!
//! A failed renewal is terminal: the loop logs it and exits without retrying.
//! Requests keep using the last published token until the device rejects it.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::constants::DEFAULT_RENEWAL_MARGIN;
use crate::credentials::{Credential, CredentialStore};
use crate::error::{Error, Result};
use crate::token::{Authenticator, ClientCredentials};

/// Owns token acquisition and renewal for one client instance.
pub struct TokenManager {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<CredentialStore>,
    margin: Duration,
}

impl TokenManager {
    /// Create a manager publishing into `store` with the default 10 minute margin.
    pub fn new(authenticator: Arc<dyn Authenticator>, store: Arc<CredentialStore>) -> Self {
        Self {
            authenticator,
            store,
            margin: DEFAULT_RENEWAL_MARGIN,
        }
    }

    /// Override the renewal margin.
    pub fn with_margin(mut self, margin: Duration) -> Self {
        self.margin = margin;
        self
    }

    pub fn margin(&self) -> Duration {
        self.margin
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Authenticate once and publish the resulting credential.
    ///
    /// Returns the token's TTL. On failure nothing is published and the
    /// caller must treat the client as unusable.
    pub async fn initialize(&self, credentials: &ClientCredentials) -> Result<Duration> {
        let credential = self.renew(credentials).await?;
        Ok(credential.ttl())
    }

    /// Re-authenticate until `cancel` fires or a grant fails.
    ///
    /// Waits until `margin` before the current credential expires, grants a new
    /// token, publishes it and reschedules from the fresh TTL. Only the waits
    /// race against cancellation; an in-flight grant always runs to completion.
    pub async fn run_renewal_loop(
        &self,
        credentials: &ClientCredentials,
        cancel: CancellationToken,
    ) -> Result<()> {
        info!(margin_secs = self.margin.as_secs(), "token renewal loop started");
        let result = self.renewal_cycle(credentials, &cancel).await;
        if let Err(e) = &result {
            error!(error = %e, "token renewal loop terminated; further renewals disabled");
        }
        info!("token renewal loop stopped");
        result
    }

    async fn renewal_cycle(
        &self,
        credentials: &ClientCredentials,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut current = self.store.get().ok_or(Error::NotAuthenticated)?;

        loop {
            let renew_at = current.renew_at(self.margin);
            debug!(
                wait_secs = renew_at
                    .saturating_duration_since(tokio::time::Instant::now())
                    .as_secs(),
                "next token renewal scheduled"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep_until(renew_at) => {}
            }

            current = self.renew(credentials).await?;
        }
    }

    /// Grant a token, enforce the schedule policy and publish.
    async fn renew(&self, credentials: &ClientCredentials) -> Result<Arc<Credential>> {
        // A grant whose TTL fails the schedule check counts as a failed grant.
        let granted = self
            .authenticator
            .authenticate(credentials)
            .await
            .and_then(|grant| check_schedule(grant.ttl, self.margin).map(|()| grant));
        let grant = match granted {
            Ok(grant) => grant,
            Err(e) => {
                metrics::counter!("peplink_token_grants_total", "outcome" => "failure")
                    .increment(1);
                warn!(client_id = %credentials.client_id, error = %e, "token grant failed");
                return Err(e);
            }
        };

        metrics::counter!("peplink_token_grants_total", "outcome" => "success").increment(1);
        info!(ttl_secs = grant.ttl.as_secs(), "authenticated against device API");

        Ok(self.store.set(Credential::new(grant.access_token, grant.ttl)))
    }
}

/// A TTL must leave room for the margin, otherwise the next renewal would be
/// due immediately (or in the past).
fn check_schedule(ttl: Duration, margin: Duration) -> Result<()> {
    if ttl <= margin {
        warn!(
            ttl_secs = ttl.as_secs(),
            margin_secs = margin.as_secs(),
            "token lifetime too short for renewal margin"
        );
        return Err(Error::Schedule {
            ttl_secs: ttl.as_secs(),
            margin_secs: margin.as_secs(),
        });
    }
    Ok(())
}

/// Spawn the renewal loop as a background task.
///
/// The task ends when `cancel` fires (returns `Ok`) or a renewal fails
/// (returns the error, already logged). Returns the task's `JoinHandle`.
pub fn spawn_renewal_task(
    manager: Arc<TokenManager>,
    credentials: ClientCredentials,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<Result<()>> {
    tokio::spawn(async move { manager.run_renewal_loop(&credentials, cancel).await })
}
