#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for async communication in xfer
//!
//! Library crates never print or install loggers themselves. Everything a
//! user should see (non-fatal failures, cache activity, progress) is sent as
//! an [`AppEvent`] through an unbounded channel; the CLI drains the channel
//! and forwards each event to `tracing`.
//!
//! ## Architecture
//!
//! - **Domain events**: grouped by functional domain (General, Download, ...)
//! - **`EventEmitter` trait**: single API for emitting regardless of whether
//!   the caller holds a raw `EventSender` or a struct that owns one

pub mod events;
pub use events::{
    AcquisitionEvent, AppEvent, CacheEvent, DownloadEvent, GeneralEvent, ProgressEvent,
};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender using the `AppEvent` system
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver using the `AppEvent` system
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel with the `AppEvent` system
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout xfer
///
/// Structs that optionally own an `EventSender` implement `event_sender`;
/// every other method has a default implementation.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::debug(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning event with context
    fn emit_warning_with_context(&self, message: impl Into<String>, context: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning_with_context(
            message, context,
        )));
    }

    /// Emit an error event
    fn emit_error(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error(message)));
    }

    /// Emit an error event with details
    fn emit_error_with_details(&self, message: impl Into<String>, details: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::error_with_details(
            message, details,
        )));
    }

    /// Emit a download started event
    fn emit_download_started(&self, method: impl Into<String>, url: impl Into<String>) {
        self.emit(AppEvent::Download(DownloadEvent::Started {
            method: method.into(),
            url: url.into(),
        }));
    }

    /// Emit a download completed event
    fn emit_download_completed(&self, url: impl Into<String>, status: u16, bytes: u64) {
        self.emit(AppEvent::Download(DownloadEvent::Completed {
            url: url.into(),
            status,
            bytes,
        }));
    }

    /// Emit a download failed event
    fn emit_download_failed(&self, url: impl Into<String>, status: u16, error: impl Into<String>) {
        self.emit(AppEvent::Download(DownloadEvent::Failed {
            url: url.into(),
            status,
            error: error.into(),
        }));
    }

    /// Emit a progress update event
    fn emit_progress_updated(&self, id: impl Into<String>, percent: f32) {
        self.emit(AppEvent::Progress(ProgressEvent::updated(id, percent)));
    }
}

/// Implementation of `EventEmitter` for the raw `EventSender`
/// This allows `EventSender` to be used directly where `EventEmitter` is expected
impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}
