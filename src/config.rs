//! Configuration file support for depscout
//!
//! Reads configuration from `~/.config/depscout/config.json`. Every key is
//! optional; the file itself is optional too.
//!
//! ```json
//! {
//!   "github_api_url": "https://github.example.com/api/v3",
//!   "pypi_url": "https://pypi.internal.example.com",
//!   "npm_url": "https://npm.internal.example.com",
//!   "registry_timeout_secs": 10,
//!   "forge_timeout_secs": 30,
//!   "rate_limit": {
//!     "max_retries": 5,
//!     "max_total_wait_secs": 3600
//!   }
//! }
//! ```

use crate::forge::GITHUB_API_URL;
use crate::http::RateLimitPolicy;
use crate::node::NPM_URL;
use crate::python::PYPI_URL;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FORGE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_MAX_TOTAL_WAIT_SECS: u64 = 3600;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine config directory. HOME environment variable not set.")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Bounds on rate-limit backoff
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitSettings {
    pub max_retries: u32,
    pub max_total_wait_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            max_total_wait_secs: DEFAULT_MAX_TOTAL_WAIT_SECS,
        }
    }
}

/// Top-level configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// GitHub REST root (GitHub Enterprise uses `https://host/api/v3`)
    pub github_api_url: String,
    pub pypi_url: String,
    pub npm_url: String,
    pub registry_timeout_secs: u64,
    pub forge_timeout_secs: u64,
    pub rate_limit: RateLimitSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github_api_url: GITHUB_API_URL.to_string(),
            pypi_url: PYPI_URL.to_string(),
            npm_url: NPM_URL.to_string(),
            registry_timeout_secs: DEFAULT_REGISTRY_TIMEOUT_SECS,
            forge_timeout_secs: DEFAULT_FORGE_TIMEOUT_SECS,
            rate_limit: RateLimitSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default path or return defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;

        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::ParseError { path, source })
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_timeout_secs)
    }

    pub fn forge_timeout(&self) -> Duration {
        Duration::from_secs(self.forge_timeout_secs)
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_retries: self.rate_limit.max_retries,
            max_total_wait: Duration::from_secs(self.rate_limit.max_total_wait_secs),
        }
    }
}

/// Returns the config file path: `~/.config/depscout/config.json`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    // Use XDG_CONFIG_HOME if set, otherwise fall back to ~/.config
    let config_base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".config"))
                .unwrap_or_default()
        });

    if config_base.as_os_str().is_empty() {
        return Err(ConfigError::NoConfigDir);
    }

    Ok(config_base.join("depscout").join("config.json"))
}
