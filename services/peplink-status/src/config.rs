//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The client secret is loaded from PEPLINK_CLIENT_SECRET or
//! client_secret_file, never stored in the TOML directly.

use common::Secret;
use peplink_api::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SECRET_ENV: &str = "PEPLINK_CLIENT_SECRET";
const DEFAULT_CONFIG_FILE: &str = "peplink-status.toml";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub device: DeviceConfig,
    #[serde(default)]
    pub status: StatusConfig,
}

/// Device API connection settings
#[derive(Debug, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to PEPLINK_CLIENT_SECRET)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_renewal_margin")]
    pub renewal_margin_secs: u64,
}

/// What to report and how often
#[derive(Debug, Default, Deserialize)]
pub struct StatusConfig {
    /// Print once and exit when unset
    #[serde(default)]
    pub poll_interval_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

fn default_renewal_margin() -> u64 {
    600
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. PEPLINK_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.status.poll_interval_secs == Some(0) {
            return Err(common::Error::Config(
                "poll_interval_secs must be greater than 0".into(),
            ));
        }

        if let Ok(secret) = std::env::var(SECRET_ENV) {
            config.device.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.device.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.device.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    /// Build and validate the client configuration.
    pub fn client_config(&self) -> common::Result<ClientConfig> {
        let device = &self.device;
        let secret = device.client_secret.clone().ok_or_else(|| {
            common::Error::Config(format!(
                "no client secret: set {SECRET_ENV} or client_secret_file"
            ))
        })?;

        let config = ClientConfig::new(device.client_id.clone(), secret)
            .with_base_url(device.base_url.clone())
            .with_timeout(Duration::from_secs(device.timeout_secs))
            .with_renewal_margin(Duration::from_secs(device.renewal_margin_secs));
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.status.poll_interval_secs.map(Duration::from_secs)
    }
}
