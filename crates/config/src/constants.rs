//! Fixed names shared by the config loader and the cache
//!
//! These are deliberately not configurable so that every process on a host
//! agrees on where the default cache lives.

/// Directory under the platform config dir holding `config.toml`
pub const CONFIG_DIR_NAME: &str = "xfer";

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory under the system temp dir used when no cache root is configured
pub const TEMP_CACHE_DIR_NAME: &str = "xfer-cache";

pub const ENV_TIMEOUT: &str = "XFER_TIMEOUT";
pub const ENV_CACHE_DIR: &str = "XFER_CACHE_DIR";
pub const ENV_PROGRESS_INTERVAL_MS: &str = "XFER_PROGRESS_INTERVAL_MS";
