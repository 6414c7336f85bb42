use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Download cache activity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CacheEvent {
    /// Key resolved to a file already on disk
    Hit { key: String, path: PathBuf },

    /// Key resolved to a path with no file behind it
    Miss { key: String, path: PathBuf },

    /// Payload persisted for a key
    Stored {
        key: String,
        path: PathBuf,
        bytes: u64,
    },

    /// Entry removed by an explicit delete
    Deleted { key: String, path: PathBuf },

    /// Whole cache directory removed
    Cleared { root: PathBuf },
}
