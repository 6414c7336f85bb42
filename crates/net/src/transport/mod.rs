//! The transport seam between the dispatcher and the wire

pub mod local;

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use xfer_errors::NetworkError;

use crate::progress::ProgressState;
use crate::request::{Headers, Method};

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, NetworkError>> + Send>>;

/// Decides whether a server certificate is acceptable
///
/// Receives the DER encoding of the peer's leaf certificate. A validator is
/// owned by one request and dropped when that request finishes.
pub trait CertificateValidator: Send + Sync {
    fn validate(&self, der: &[u8]) -> bool;
}

impl<F> CertificateValidator for F
where
    F: Fn(&[u8]) -> bool + Send + Sync,
{
    fn validate(&self, der: &[u8]) -> bool {
        self(der)
    }
}

/// Everything a transport needs to perform one exchange
pub struct TransportRequest<'a> {
    pub method: Method,
    pub url: &'a str,
    pub headers: &'a Headers,
    pub body: Option<Bytes>,
    /// Per-request override; `None` keeps the transport default
    pub timeout: Option<Duration>,
    /// Checked during the TLS handshake, before any request bytes are sent
    pub certificate_validator: Option<Arc<dyn CertificateValidator>>,
    /// Upload counters are advanced by the transport while the body is sent
    pub progress: Arc<ProgressState>,
}

/// Status line, headers and a body that is still on the wire
///
/// `headers` is `None` when the response carried no readable headers.
pub struct TransportResponse {
    pub status: u16,
    pub headers: Option<Headers>,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Sends one request and returns the response head with a body stream
///
/// Any HTTP status is a successful exchange here; only failures to obtain
/// a response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest<'_>) -> Result<TransportResponse, NetworkError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: TransportRequest<'_>) -> Result<TransportResponse, NetworkError> {
        (**self).send(request).await
    }
}
