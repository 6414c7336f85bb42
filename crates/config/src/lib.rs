#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for xfer
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/xfer/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

pub mod constants;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use xfer_errors::{ConfigError, Error};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub cache: CacheConfig,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-request timeout in seconds; 0 keeps the transport default
    #[serde(default)]
    pub timeout: i64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
}

/// Download cache configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Cache directory; the system temp dir is used when unset
    pub root: Option<PathBuf>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: 0,
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
            progress_interval_ms: default_progress_interval_ms(),
        }
    }
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("xfer/{}", env!("CARGO_PKG_VERSION"))
}

fn default_progress_interval_ms() -> u64 {
    50
}

impl NetworkConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    #[must_use]
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir
            .join(constants::CONFIG_DIR_NAME)
            .join(constants::CONFIG_FILE_NAME))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let Ok(config_path) = Self::default_path() else {
            return Ok(Self::default());
        };

        if config_path.exists() {
            tracing::debug!(path = %config_path.display(), "loading config");
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: &Option<PathBuf>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // XFER_TIMEOUT
        if let Ok(timeout) = std::env::var(constants::ENV_TIMEOUT) {
            self.network.timeout = timeout.parse().map_err(|_| ConfigError::InvalidValue {
                field: constants::ENV_TIMEOUT.to_string(),
                value: timeout,
            })?;
        }

        // XFER_CACHE_DIR
        if let Ok(dir) = std::env::var(constants::ENV_CACHE_DIR) {
            if dir.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: constants::ENV_CACHE_DIR.to_string(),
                    value: dir,
                }
                .into());
            }
            self.cache.root = Some(PathBuf::from(dir));
        }

        // XFER_PROGRESS_INTERVAL_MS
        if let Ok(interval) = std::env::var(constants::ENV_PROGRESS_INTERVAL_MS) {
            self.network.progress_interval_ms =
                interval.parse().map_err(|_| ConfigError::InvalidValue {
                    field: constants::ENV_PROGRESS_INTERVAL_MS.to_string(),
                    value: interval,
                })?;
        }

        Ok(())
    }

    /// Get the cache root (with default)
    #[must_use]
    pub fn cache_root(&self) -> PathBuf {
        self.cache
            .root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(constants::TEMP_CACHE_DIR_NAME))
    }
}
