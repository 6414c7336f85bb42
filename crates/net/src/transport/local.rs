//! `file://` support in front of another transport

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::TryStreamExt;
use tokio_util::io::ReaderStream;
use url::Url;
use xfer_errors::NetworkError;

use super::{Transport, TransportRequest, TransportResponse};
use crate::request::{Headers, Method};

/// Serves `file://` GETs from disk and hands every other URL to `inner`
///
/// A missing file answers 404 so that callers see the same failure shape
/// as for a remote miss.
#[derive(Debug, Clone)]
pub(crate) struct LocalFileTransport<T> {
    inner: T,
}

impl<T: Transport> LocalFileTransport<T> {
    pub(crate) fn new(inner: T) -> Self {
        Self { inner }
    }
}

/// Filesystem path behind a `file://` URL
#[must_use]
pub fn local_path(url: &str) -> Option<PathBuf> {
    let parsed = Url::parse(url).ok()?;
    if parsed.scheme() != "file" {
        return None;
    }
    parsed.to_file_path().ok()
}

/// `file://` URL for a path, made absolute against the working directory
///
/// # Errors
///
/// Returns [`NetworkError::InvalidUrl`] when the path cannot be expressed
/// as a URL.
pub fn file_url(path: &Path) -> Result<String, NetworkError> {
    let absolute = std::path::absolute(path)
        .map_err(|e| NetworkError::InvalidUrl(format!("{}: {e}", path.display())))?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|()| NetworkError::InvalidUrl(absolute.display().to_string()))
}

#[async_trait]
impl<T: Transport> Transport for LocalFileTransport<T> {
    async fn send(&self, request: TransportRequest<'_>) -> Result<TransportResponse, NetworkError> {
        let Some(path) = local_path(request.url) else {
            return self.inner.send(request).await;
        };

        if request.method != Method::Get {
            return Err(NetworkError::InvalidUrl(format!(
                "{} is not supported for {}",
                request.method, request.url
            )));
        }

        let mut headers = Headers::new();
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                headers.insert("Content-Length", "0");
                return Ok(TransportResponse {
                    status: 404,
                    headers: Some(headers),
                    content_length: Some(0),
                    body: Box::pin(futures::stream::empty()),
                });
            }
            Err(e) => {
                return Err(NetworkError::DownloadFailed(format!(
                    "{}: {e}",
                    path.display()
                )))
            }
        };

        let content_length = file.metadata().await.ok().map(|meta| meta.len());
        if let Some(len) = content_length {
            headers.insert("Content-Length", len.to_string());
        }

        let body = ReaderStream::new(file)
            .map_err(|e| NetworkError::DownloadFailed(e.to_string()));

        Ok(TransportResponse {
            status: 200,
            headers: Some(headers),
            content_length,
            body: Box::pin(body),
        })
    }
}
