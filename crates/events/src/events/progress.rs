use serde::{Deserialize, Serialize};

/// Progress tracking events for in-flight transfers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProgressEvent {
    /// Completion percentage changed (0-100)
    Updated { id: String, percent: f32 },
}

impl ProgressEvent {
    /// Create a progress update event
    pub fn updated(id: impl Into<String>, percent: f32) -> Self {
        Self::Updated {
            id: id.into(),
            percent,
        }
    }
}
