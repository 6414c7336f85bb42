//! Structured logging integration for events
//!
//! Every [`AppEvent`] the libraries emit is turned into a tracing record
//! with structured fields, at a level matching its severity.

use tracing::{debug, error, info, trace, warn};
use xfer_events::{
    AcquisitionEvent, AppEvent, CacheEvent, DownloadEvent, GeneralEvent, ProgressEvent,
};

/// Log an `AppEvent` using the tracing infrastructure with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let domain = event.domain();
    match event {
        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message, context } => {
                warn!(domain, context = ?context, "{message}");
            }
            GeneralEvent::Error { message, details } => {
                error!(domain, details = ?details, "{message}");
            }
            GeneralEvent::DebugLog { message, context } => {
                debug!(domain, context = ?context, "{message}");
            }
        },

        AppEvent::Download(download) => match download {
            DownloadEvent::Started { method, url } => {
                info!(domain, method = %method, url = %url, "Transfer started");
            }
            DownloadEvent::Completed { url, status, bytes } => {
                info!(domain, url = %url, status, bytes, "Transfer completed");
            }
            DownloadEvent::Failed { url, status, error } => {
                error!(domain, url = %url, status, error = %error, "Transfer failed");
            }
        },

        AppEvent::Progress(ProgressEvent::Updated { id, percent }) => {
            trace!(domain, id = %id, percent, "Progress");
        }

        AppEvent::Cache(cache) => match cache {
            CacheEvent::Hit { key, path } => {
                debug!(domain, key = %key, path = %path.display(), "Cache hit");
            }
            CacheEvent::Miss { key, path } => {
                debug!(domain, key = %key, path = %path.display(), "Cache miss");
            }
            CacheEvent::Stored { key, path, bytes } => {
                info!(domain, key = %key, path = %path.display(), bytes, "Cache entry stored");
            }
            CacheEvent::Deleted { key, path } => {
                info!(domain, key = %key, path = %path.display(), "Cache entry deleted");
            }
            CacheEvent::Cleared { root } => {
                info!(domain, root = %root.display(), "Cache cleared");
            }
        },

        AppEvent::Acquisition(acquisition) => match acquisition {
            AcquisitionEvent::Completed {
                kind,
                url,
                from_cache,
            } => {
                info!(domain, kind = %kind, url = %url, from_cache, "Acquired");
            }
            AcquisitionEvent::Failed {
                kind,
                url,
                status,
                body,
            } => {
                error!(domain, kind = %kind, url = %url, status, body = %body, "Acquisition failed");
            }
        },
    }
}
