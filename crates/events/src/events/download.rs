use serde::{Deserialize, Serialize};

/// Transfer lifecycle events emitted by the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// Transfer handed to the transport
    Started { method: String, url: String },

    /// Transfer finished and was classified as a success
    Completed { url: String, status: u16, bytes: u64 },

    /// Transfer finished and was classified as a failure
    Failed {
        url: String,
        /// 0 when no response was received
        status: u16,
        error: String,
    },
}
