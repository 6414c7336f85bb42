#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Typed media downloads backed by the download cache
//!
//! [`MediaAcquirer`] fetches binary assets, archives and plain files. Each
//! call consults the [`DownloadCache`] first, dispatches through the
//! [`RequestDispatcher`] on a miss, persists what it fetched and returns the
//! typed result. Failures are logged and surface as `None`.

mod decoder;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use xfer_cache::DownloadCache;
use xfer_events::{AcquisitionEvent, AppEvent, EventEmitter, EventSender};
use xfer_net::{
    file_url, local_path, CancellationToken, ProgressSink, Request, RequestDispatcher,
    ResponseHandler,
};

pub use decoder::{MediaDecoder, RawBytes};
use decoder::DecodeSlot;

const FILE_SCHEME: &str = "file://";

/// Binary asset flavours that share the same acquisition path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Texture,
    Audio,
}

impl AssetKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Texture => "texture",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-call extras for an acquisition
#[derive(Clone, Default)]
pub struct AcquireOptions {
    pub progress: Option<Arc<dyn ProgressSink>>,
    pub cancel: Option<CancellationToken>,
    /// Seconds; zero or negative keeps the transport default
    pub timeout_secs: i64,
}

impl AcquireOptions {
    #[must_use]
    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    #[must_use]
    pub fn timeout_secs(mut self, secs: i64) -> Self {
        self.timeout_secs = secs;
        self
    }

    fn apply(self, mut request: Request) -> Request {
        if let Some(sink) = self.progress {
            request = request.progress(sink);
        }
        if let Some(token) = self.cancel {
            request = request.cancellation(token);
        }
        request.timeout_secs(self.timeout_secs)
    }
}

impl fmt::Debug for AcquireOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquireOptions")
            .field("progress", &self.progress.is_some())
            .field("cancel", &self.cancel)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Where a fetch reads from and whether the result still needs caching
struct Source {
    url: String,
    persist: bool,
}

/// Cache-aware typed downloads
#[derive(Clone)]
pub struct MediaAcquirer {
    dispatcher: Arc<RequestDispatcher>,
    cache: Arc<DownloadCache>,
    event_sender: Option<EventSender>,
}

impl EventEmitter for MediaAcquirer {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl MediaAcquirer {
    pub fn new(dispatcher: Arc<RequestDispatcher>, cache: Arc<DownloadCache>) -> Self {
        Self {
            dispatcher,
            cache,
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.event_sender = Some(tx);
        self
    }

    #[must_use]
    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    /// Fetch and decode a texture or audio asset
    pub async fn acquire_asset<D: MediaDecoder>(
        &self,
        kind: AssetKind,
        url: &str,
        decoder: D,
        options: AcquireOptions,
    ) -> Option<D::Output> {
        let decoder = Arc::new(decoder);
        let (slot, rx) = DecodeSlot::new(Arc::clone(&decoder));
        let handler = match kind {
            AssetKind::Texture => ResponseHandler::StreamedToTexture(Box::new(slot)),
            AssetKind::Audio => ResponseHandler::StreamedToAudio(Box::new(slot)),
        };
        self.acquire_decoded(kind.as_str(), url, &*decoder, handler, rx, options)
            .await
    }

    /// Fetch and decode an archive bundle
    pub async fn acquire_archive<D: MediaDecoder>(
        &self,
        url: &str,
        decoder: D,
        options: AcquireOptions,
    ) -> Option<D::Output> {
        let decoder = Arc::new(decoder);
        let (slot, rx) = DecodeSlot::new(Arc::clone(&decoder));
        let handler = ResponseHandler::StreamedToArchive(Box::new(slot));
        self.acquire_decoded("archive", url, &*decoder, handler, rx, options)
            .await
    }

    /// Fetch a file into the cache and return its path
    ///
    /// A cached file is returned without any transfer; a `file://` URL is
    /// returned as its local path when the file exists.
    pub async fn acquire_file(&self, url: &str, options: AcquireOptions) -> Option<PathBuf> {
        const KIND: &str = "file";

        if url.starts_with(FILE_SCHEME) {
            return match local_path(url) {
                Some(path) if tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file()) => {
                    self.report_completed(KIND, url, true);
                    Some(path)
                }
                _ => {
                    self.report_failed(KIND, url, 404, "local file not found");
                    None
                }
            };
        }

        let entry = self.cache.resolve(url).await;
        if entry.exists {
            self.report_completed(KIND, url, true);
            return Some(entry.path);
        }

        let request = options.apply(
            Request::get(url).handler(ResponseHandler::StreamedToFile(entry.path.clone())),
        );
        let response = self.dispatcher.send(request).await;
        if !response.is_success() {
            self.report_failed(KIND, url, response.status(), response.error());
            return None;
        }

        if let Ok(meta) = tokio::fs::metadata(&entry.path).await {
            self.cache.record_stored(url, &entry.path, meta.len());
        }
        self.report_completed(KIND, url, false);
        Some(entry.path)
    }

    async fn acquire_decoded<D: MediaDecoder>(
        &self,
        kind: &str,
        url: &str,
        decoder: &D,
        handler: ResponseHandler,
        rx: tokio::sync::oneshot::Receiver<D::Output>,
        options: AcquireOptions,
    ) -> Option<D::Output> {
        let source = self.source_for(url).await;
        let request = options.apply(Request::get(source.url.as_str()).handler(handler));
        let response = self.dispatcher.send(request).await;

        if !response.is_success() {
            self.report_failed(kind, url, response.status(), response.error());
            return None;
        }

        let Ok(output) = rx.await else {
            self.report_failed(kind, url, response.status(), "decoder produced no value");
            return None;
        };

        if source.persist {
            self.persist(kind, url, decoder, &output).await;
        }

        self.report_completed(kind, url, !source.persist);
        Some(output)
    }

    async fn source_for(&self, url: &str) -> Source {
        if url.starts_with(FILE_SCHEME) {
            return Source {
                url: url.to_string(),
                persist: false,
            };
        }

        let entry = self.cache.resolve(url).await;
        if entry.exists {
            match file_url(&entry.path) {
                Ok(cached) => {
                    return Source {
                        url: cached,
                        persist: false,
                    }
                }
                Err(e) => {
                    tracing::debug!(url, error = %e, "cached entry not addressable; refetching");
                }
            }
        }

        Source {
            url: url.to_string(),
            persist: true,
        }
    }

    /// Cache the encoded output; failures are logged and do not affect the result
    async fn persist<D: MediaDecoder>(
        &self,
        kind: &str,
        url: &str,
        decoder: &D,
        output: &D::Output,
    ) {
        let bytes = match decoder.encode(output) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(kind, url, error = %e, "could not encode asset for caching");
                self.emit_error_with_details(format!("could not cache {kind} from {url}"), e.to_string());
                return;
            }
        };

        if let Err(e) = self.cache.store(url, &bytes).await {
            tracing::warn!(kind, url, error = %e, "could not write cache entry");
            self.emit_error_with_details(format!("could not cache {kind} from {url}"), e.to_string());
        }
    }

    fn report_completed(&self, kind: &str, url: &str, from_cache: bool) {
        tracing::debug!(kind, url, from_cache, "acquired");
        self.emit(AppEvent::Acquisition(AcquisitionEvent::Completed {
            kind: kind.to_string(),
            url: url.to_string(),
            from_cache,
        }));
    }

    fn report_failed(&self, kind: &str, url: &str, status: u16, body: &str) {
        tracing::error!(kind, url, status, body, "acquisition failed");
        self.emit(AppEvent::Acquisition(AcquisitionEvent::Failed {
            kind: kind.to_string(),
            url: url.to_string(),
            status,
            body: body.to_string(),
        }));
    }
}
