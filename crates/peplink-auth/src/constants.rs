//! Token-grant endpoint constants
//!
//! The grant endpoint is served by the device itself, so only the path is
//! fixed here; the base URL comes from client configuration.

use std::time::Duration;

/// Path of the token grant endpoint, relative to the device base URL
pub const TOKEN_GRANT_PATH: &str = "/api/auth.token.grant";

/// Scope requested for every grant
pub const TOKEN_SCOPE: &str = "api";

/// How long before expiry a token is renewed.
/// Device tokens typically live for 48 hours.
pub const DEFAULT_RENEWAL_MARGIN: Duration = Duration::from_secs(10 * 60);
