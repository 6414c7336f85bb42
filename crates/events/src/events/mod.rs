use serde::{Deserialize, Serialize};

// Declare all domain modules
pub mod acquisition;
pub mod cache;
pub mod download;
pub mod general;
pub mod progress;

// Re-export all domain events
pub use acquisition::*;
pub use cache::*;
pub use download::*;
pub use general::*;
pub use progress::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// General utility events (warnings, errors, debug output)
    General(GeneralEvent),

    /// HTTP transfer lifecycle
    Download(DownloadEvent),

    /// Percent-complete updates for in-flight transfers
    Progress(ProgressEvent),

    /// Download cache activity
    Cache(CacheEvent),

    /// Typed media acquisition outcomes
    Acquisition(AcquisitionEvent),
}

impl AppEvent {
    /// Short domain label used as a structured logging field
    #[must_use]
    pub fn domain(&self) -> &'static str {
        match self {
            Self::General(_) => "general",
            Self::Download(_) => "download",
            Self::Progress(_) => "progress",
            Self::Cache(_) => "cache",
            Self::Acquisition(_) => "acquisition",
        }
    }
}
