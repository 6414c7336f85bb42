use serde::{Deserialize, Serialize};

/// Typed media acquisition outcomes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AcquisitionEvent {
    /// Media fetched (or served from cache) and decoded
    Completed {
        kind: String,
        url: String,
        from_cache: bool,
    },

    /// Media could not be fetched or decoded; the caller received nothing
    Failed {
        kind: String,
        url: String,
        status: u16,
        body: String,
    },
}
