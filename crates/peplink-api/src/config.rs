//! Client configuration
//!
//! `ClientConfig` is built by whoever embeds the client (a CLI, a service
//! config loader, a test) and validated before the first grant. The client
//! itself never reads the environment or command line.

use std::time::Duration;

use common::Secret;
use peplink_auth::{ClientCredentials, DEFAULT_RENEWAL_MARGIN};

/// Default device endpoint when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

/// Default per-request timeout, applied to the grant call as well.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the client needs to reach and authenticate against a device.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub renewal_margin: Duration,
}

impl ClientConfig {
    /// Config for `client_id`/`client_secret` with default URL, timeout and margin.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret<String>>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            renewal_margin: DEFAULT_RENEWAL_MARGIN,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_renewal_margin(mut self, margin: Duration) -> Self {
        self.renewal_margin = margin;
        self
    }

    /// Reject configurations that cannot possibly work.
    pub fn validate(&self) -> common::Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.timeout.is_zero() {
            return Err(common::Error::Config(
                "timeout must be greater than 0".into(),
            ));
        }

        if self.client_id.trim().is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }

        if self.client_secret.is_blank() {
            return Err(common::Error::Config(
                "client_secret must not be empty".into(),
            ));
        }

        if self.renewal_margin.is_zero() {
            return Err(common::Error::Config(
                "renewal_margin must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Credentials sent on every grant.
    pub fn credentials(&self) -> ClientCredentials {
        ClientCredentials::new(self.client_id.clone(), self.client_secret.clone())
    }
}
