//! Sending requests and classifying their outcome

mod classify;
mod stream;
mod validation;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use xfer_errors::Error;
use xfer_events::{EventEmitter, EventSender};

use self::classify::{Outcome, Payload};
use self::stream::StreamError;
use crate::client::NetClient;
use crate::handler::ResponseHandler;
use crate::monitor::ProgressMonitor;
use crate::progress::{ProgressSink, ProgressState};
use crate::request::{timeout_override, Request, CONTENT_TYPE};
use crate::response::Response;
use crate::transport::local::LocalFileTransport;
use crate::transport::{Transport, TransportRequest, TransportResponse};

const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(50);

/// Sends [`Request`]s and turns every outcome into a [`Response`]
///
/// Network and protocol failures never escape as errors. Each call owns
/// its certificate validator, buffers and progress monitor and releases
/// them before returning. Failures are not retried.
#[derive(Clone)]
pub struct RequestDispatcher {
    transport: Arc<dyn Transport>,
    progress_interval: Duration,
    event_sender: Option<EventSender>,
}

impl EventEmitter for RequestDispatcher {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl RequestDispatcher {
    /// Dispatcher over `transport`
    ///
    /// `file://` URLs are always served from disk; every other URL goes to
    /// `transport`.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(LocalFileTransport::new(transport)),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            event_sender: None,
        }
    }

    /// reqwest transport with default settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, Error> {
        Ok(Self::new(NetClient::with_defaults()?))
    }

    #[must_use]
    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval.max(Duration::from_millis(1));
        self
    }

    #[must_use]
    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.event_sender = Some(tx);
        self
    }

    /// Perform one transfer
    ///
    /// When the request carries a progress sink, a monitor polls the
    /// transfer while it runs and the sink always receives a final 100
    /// before this returns, whatever the outcome. Cancelling the request's
    /// token aborts the transfer and yields a failed response.
    #[allow(clippy::too_many_lines)]
    pub async fn send(&self, request: Request) -> Response {
        let Request {
            method,
            url,
            mut headers,
            body,
            timeout_secs,
            certificate_validator,
            cancel,
            progress,
            handler,
        } = request;

        if let Err(e) = validation::validate_url(&url) {
            let response = Response::failure(0, e.to_string());
            self.emit_download_failed(url, 0, response.error());
            return response;
        }

        let payload = body.map(|body| {
            if let Some(content_type) = body.default_content_type() {
                if !headers.contains(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, content_type);
                }
            }
            body.encode()
        });
        if method.is_upload() {
            if let Some(content_type) = headers.get(CONTENT_TYPE) {
                let normalized = content_type.replace('"', "");
                headers.insert(CONTENT_TYPE, normalized);
            }
        }

        let state = Arc::new(ProgressState::new());
        let abort = cancel.child_token();
        let monitor = progress.as_ref().map(|sink| {
            ProgressMonitor::spawn(
                method,
                Arc::clone(&state),
                Arc::clone(sink),
                cancel.clone(),
                abort.clone(),
                self.progress_interval,
            )
        });

        self.emit_download_started(method.as_str(), url.as_str());
        tracing::debug!(%method, url = %url, handler = handler.kind(), "dispatching");

        let transfer = self.transfer(
            TransportRequest {
                method,
                url: &url,
                headers: &headers,
                body: payload,
                timeout: timeout_override(timeout_secs),
                certificate_validator: certificate_validator.clone(),
                progress: Arc::clone(&state),
            },
            handler,
            &state,
        );

        let outcome = tokio::select! {
            biased;
            () = abort.cancelled() => Outcome::Aborted,
            outcome = transfer => outcome,
        };

        state.mark_complete();
        if let Some(monitor) = monitor {
            monitor.finish().await;
        }
        if let Some(sink) = &progress {
            report_final(sink.as_ref());
        }
        drop(certificate_validator);

        let response = classify::classify(outcome);
        if response.is_success() {
            self.emit_download_completed(url, response.status(), state.downloaded());
        } else {
            self.emit_download_failed(url, response.status(), response.error());
        }
        response
    }

    async fn transfer(
        &self,
        request: TransportRequest<'_>,
        handler: ResponseHandler,
        state: &ProgressState,
    ) -> Outcome {
        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => return Outcome::Failed { status: 0, error },
        };

        if let Some(len) = response.content_length {
            state.set_download_total(len);
        }
        let TransportResponse {
            status,
            headers,
            body,
            ..
        } = response;

        if status >= 400 {
            // An unreadable error body still leaves the headers to report
            let body = stream::drain(body, state).await.unwrap_or_default();
            return Outcome::Protocol {
                status,
                headers,
                body,
            };
        }

        match handler {
            ResponseHandler::Buffered => match stream::drain(body, state).await {
                Ok(data) => Outcome::Completed {
                    status,
                    payload: Payload::Buffered(data),
                },
                Err(error) => Outcome::Failed { status, error },
            },
            ResponseHandler::StreamedToFile(path) => {
                match stream::write_to_file(body, state, &path).await {
                    Ok(written) => {
                        tracing::debug!(path = %path.display(), bytes = written, "wrote response body");
                        Outcome::Completed {
                            status,
                            payload: Payload::Consumed,
                        }
                    }
                    Err(StreamError::Network(error)) => Outcome::Failed { status, error },
                    Err(StreamError::Write(error)) => Outcome::Decode {
                        status,
                        error,
                        data: bytes::Bytes::new(),
                    },
                }
            }
            ResponseHandler::StreamedToTexture(mut sink)
            | ResponseHandler::StreamedToAudio(mut sink)
            | ResponseHandler::StreamedToArchive(mut sink) => {
                let data = match stream::drain(body, state).await {
                    Ok(data) => data,
                    Err(error) => return Outcome::Failed { status, error },
                };
                match sink.accept(data.clone()) {
                    Ok(()) => Outcome::Completed {
                        status,
                        payload: Payload::Consumed,
                    },
                    Err(error) => Outcome::Decode {
                        status,
                        error,
                        data,
                    },
                }
            }
        }
    }
}

fn report_final(sink: &dyn ProgressSink) {
    if catch_unwind(AssertUnwindSafe(|| sink.report(100.0))).is_err() {
        tracing::debug!("progress sink panicked on final report");
    }
}
