//! Peplink device API authentication
//!
//! Obtains short-lived access tokens from the device's token-grant endpoint
//! and keeps them fresh. This crate has no knowledge of the API endpoints
//! that consume the token; it only owns the token lifecycle.
//!
//! Token flow:
//! 1. Caller builds `ClientCredentials` and an `Authenticator` (usually `HttpAuthenticator`)
//! 2. `TokenManager::initialize()` grants the first token and publishes it
//! 3. `spawn_renewal_task()` re-grants before every expiry, `margin` ahead of time
//! 4. Request paths read the current token via `CredentialStore::get()`
//! 5. Cancelling the `CancellationToken` stops the renewal task

pub mod constants;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod token;

pub use constants::*;
pub use credentials::{Credential, CredentialStore};
pub use error::{Error, Result};
pub use manager::{TokenManager, spawn_renewal_task};
pub use token::{Authenticator, ClientCredentials, HttpAuthenticator, TokenGrant, parse_grant};
