//! Shared transfer counters and progress sinks

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use xfer_events::{EventEmitter, EventSender};

use crate::request::Method;

/// Receives progress percentages in `0.0..=100.0`
pub trait ProgressSink: Send + Sync {
    fn report(&self, percent: f32);
}

impl<F> ProgressSink for F
where
    F: Fn(f32) + Send + Sync,
{
    fn report(&self, percent: f32) {
        self(percent);
    }
}

/// Forwards progress to the event channel under a transfer id
#[derive(Debug, Clone)]
pub struct EventProgress {
    tx: EventSender,
    id: String,
}

impl EventProgress {
    pub fn new(tx: EventSender, id: impl Into<String>) -> Self {
        Self { tx, id: id.into() }
    }
}

impl ProgressSink for EventProgress {
    fn report(&self, percent: f32) {
        self.tx.emit_progress_updated(self.id.clone(), percent);
    }
}

/// Byte counters updated by the transport and polled by the monitor
///
/// A total of zero means the size is unknown.
#[derive(Debug, Default)]
pub struct ProgressState {
    uploaded: AtomicU64,
    upload_total: AtomicU64,
    downloaded: AtomicU64,
    download_total: AtomicU64,
    complete: AtomicBool,
    cancel_requested: AtomicBool,
}

impl ProgressState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_upload_total(&self, total: u64) {
        self.upload_total.store(total, Ordering::Relaxed);
    }

    pub fn add_uploaded(&self, bytes: u64) {
        self.uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn set_download_total(&self, total: u64) {
        self.download_total.store(total, Ordering::Relaxed);
    }

    pub fn add_downloaded(&self, bytes: u64) {
        self.downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    #[must_use]
    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn uploaded(&self) -> u64 {
        self.uploaded.load(Ordering::Relaxed)
    }

    pub fn mark_complete(&self) {
        self.complete.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// Current percentage for `method`
    ///
    /// Uploads (POST/PUT) measure the request body, everything else the
    /// response body. An unknown total reads as 0 until the transfer
    /// completes.
    #[must_use]
    pub fn percent(&self, method: Method) -> f32 {
        if self.is_complete() {
            return 100.0;
        }
        let (done, total) = if method.is_upload() {
            (self.uploaded(), self.upload_total.load(Ordering::Relaxed))
        } else {
            (self.downloaded(), self.download_total.load(Ordering::Relaxed))
        };
        if total == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let percent = (done as f64 / total as f64 * 100.0) as f32;
        percent.clamp(0.0, 100.0)
    }
}
