//! Configuration and file-loading errors

use thiserror::Error;

/// Errors raised while building or loading client configuration
#[derive(Error, Debug)]
pub enum Error {
    /// A setting is missing or out of range (base URL, client id, timeouts).
    #[error("invalid device client settings: {0}")]
    Config(String),

    /// The settings file or the client secret file could not be read.
    #[error("cannot read device client settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
