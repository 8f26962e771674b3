//! Token grant against the device API
//!
//! The device issues client-credentials tokens from `POST /api/auth.token.grant`.
//! The reply uses the API's standard envelope, with the TTL encoded as a
//! numeric *string*:
//!
//! ```json
//! {"stat":"ok","response":{"accessToken":"43c6…","expiresIn":"172800"}}
//! ```
//!
//! `Authenticator` is the seam the `TokenManager` talks through, so renewal
//! scheduling can be exercised without a device.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::{TOKEN_GRANT_PATH, TOKEN_SCOPE};
use crate::error::{Error, Result};

/// Client ID and secret sent on every grant.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret<String>>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }
}

/// A freshly issued access token and its lifetime at issue time.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    pub access_token: Secret<String>,
    pub ttl: Duration,
}

/// JSON body posted to the grant endpoint.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GrantRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'a str,
}

/// Envelope returned by the grant endpoint. Only the fields we use are modelled.
#[derive(Debug, Deserialize)]
struct GrantResponse {
    #[serde(default)]
    stat: String,
    #[serde(default)]
    response: Option<GrantPayload>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrantPayload {
    access_token: String,
    /// Seconds until expiry, as a decimal string
    expires_in: String,
}

/// Transport used by the token manager to obtain grants.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Authenticator>`).
pub trait Authenticator: Send + Sync {
    /// Request a new token for `credentials`.
    fn authenticate<'a>(
        &'a self,
        credentials: &'a ClientCredentials,
    ) -> Pin<Box<dyn Future<Output = Result<TokenGrant>> + Send + 'a>>;
}

/// Authenticator that calls the device's grant endpoint over HTTP.
///
/// The request timeout is whatever the supplied `reqwest::Client` was built
/// with; no additional deadline is applied here.
#[derive(Debug, Clone)]
pub struct HttpAuthenticator {
    http: reqwest::Client,
    grant_url: String,
}

impl HttpAuthenticator {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            grant_url: format!("{}{TOKEN_GRANT_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Full URL of the grant endpoint.
    pub fn grant_url(&self) -> &str {
        &self.grant_url
    }
}

impl Authenticator for HttpAuthenticator {
    fn authenticate<'a>(
        &'a self,
        credentials: &'a ClientCredentials,
    ) -> Pin<Box<dyn Future<Output = Result<TokenGrant>> + Send + 'a>> {
        Box::pin(async move {
            let body = GrantRequest {
                client_id: &credentials.client_id,
                client_secret: credentials.client_secret.expose_str(),
                scope: TOKEN_SCOPE,
            };

            debug!(url = %self.grant_url, client_id = %credentials.client_id, "requesting token grant");

            let response = self
                .http
                .post(&self.grant_url)
                .json(&body)
                .send()
                .await
                .map_err(|e| Error::Auth(format!("token grant request failed: {e}")))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| Error::Auth(format!("reading token grant response: {e}")))?;

            parse_grant(status.as_u16(), &text).inspect_err(|e| {
                warn!(http_status = status.as_u16(), error = %e, "token grant rejected");
            })
        })
    }
}

/// Interpret a grant endpoint reply.
///
/// Fails with `Error::Auth` if the body is not an envelope, `stat` is not
/// `"ok"`, or `expiresIn` is not a non-negative integer.
pub fn parse_grant(http_status: u16, body: &str) -> Result<TokenGrant> {
    let envelope: GrantResponse = serde_json::from_str(body).map_err(|e| {
        Error::Auth(format!(
            "unreadable token grant response (HTTP {http_status}): {e}; body='{body}'"
        ))
    })?;

    if envelope.stat != "ok" {
        return Err(Error::Auth(format!(
            "stat='{}' code={} message='{}' (HTTP {http_status})",
            envelope.stat,
            envelope.code.map_or_else(|| "-".to_string(), |c| c.to_string()),
            envelope.message.unwrap_or_default(),
        )));
    }

    let payload = envelope
        .response
        .ok_or_else(|| Error::Auth("token grant succeeded without a response payload".into()))?;

    let secs: u64 = payload.expires_in.trim().parse().map_err(|e| {
        Error::Auth(format!(
            "unexpected expiresIn '{}': {e}",
            payload.expires_in
        ))
    })?;

    Ok(TokenGrant {
        access_token: Secret::new(payload.access_token),
        ttl: Duration::from_secs(secs),
    })
}
