//! Error types for token lifecycle operations

/// Errors from token grant and renewal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The grant call failed: transport error, non-ok `stat`, unreadable
    /// body, or an `expiresIn` that is not an integer.
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error(
        "token schedule rejected: ttl {ttl_secs}s does not exceed renewal margin {margin_secs}s"
    )]
    Schedule { ttl_secs: u64, margin_secs: u64 },

    #[error("no credential published; initialize must succeed before renewal starts")]
    NotAuthenticated,
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
