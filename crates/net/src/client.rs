//! reqwest-backed transport with connection pooling

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::Client;
use xfer_errors::{Error, NetworkError};

use crate::progress::ProgressState;
use crate::request::{Headers, Method};
use crate::tls::CertificateGate;
use crate::transport::{Transport, TransportRequest, TransportResponse};

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Whole-request timeout when the request carries no override
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
    /// Upload bodies are sent in chunks of this size so progress can advance
    pub upload_chunk_size: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes for large downloads
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("xfer/{}", env!("CARGO_PKG_VERSION")),
            upload_chunk_size: 16 * 1024,
        }
    }
}

/// HTTP client wrapper implementing [`Transport`]
///
/// Requests without a certificate validator go through one pooled client
/// that trusts the platform roots. A request that brings its own
/// [`crate::CertificateValidator`] gets a dedicated, unpooled client whose
/// TLS handshake hands the peer certificate to that validator, so a
/// rejected peer never sees the request.
#[derive(Clone)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Self::builder(&config)
            .build()
            .map_err(|e| NetworkError::TlsError(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    fn builder(config: &NetConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
    }

    /// Client whose handshake is decided by `gate`
    ///
    /// Idle connections are not kept, so no later request can reuse a
    /// connection this validator accepted.
    fn gated(&self, gate: &Arc<CertificateGate>) -> Result<Client, NetworkError> {
        let tls = CertificateGate::client_config(Arc::clone(gate))?;
        Self::builder(&self.config)
            .use_preconfigured_tls(tls)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| NetworkError::TlsError(e.to_string()))
    }

    /// Chunked upload body that advances the upload counter as hyper pulls it
    fn upload_body(&self, payload: Bytes, state: &Arc<ProgressState>) -> reqwest::Body {
        let chunk_size = self.config.upload_chunk_size.max(1);
        let chunks: Vec<Bytes> = (0..payload.len())
            .step_by(chunk_size)
            .map(|start| payload.slice(start..payload.len().min(start + chunk_size)))
            .collect();

        let state = Arc::clone(state);
        let stream = futures::stream::iter(chunks).map(move |chunk| {
            state.add_uploaded(chunk.len() as u64);
            Ok::<_, std::io::Error>(chunk)
        });
        reqwest::Body::wrap_stream(stream)
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
    }
}

fn map_error(e: &reqwest::Error, url: &str) -> NetworkError {
    NetworkError::classify(e.to_string(), url, e.is_timeout(), e.is_connect())
}

/// Repeated fields are joined; values that are not valid UTF-8 are kept lossily
fn read_headers(map: &HeaderMap) -> Option<Headers> {
    if map.is_empty() {
        return None;
    }
    let mut headers = Headers::new();
    for (name, value) in map {
        headers.append(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    Some(headers)
}

#[async_trait]
impl Transport for NetClient {
    async fn send(&self, request: TransportRequest<'_>) -> Result<TransportResponse, NetworkError> {
        let gate = request
            .certificate_validator
            .clone()
            .map(|validator| Arc::new(CertificateGate::new(validator)));
        let client = match &gate {
            Some(gate) => self.gated(gate)?,
            None => self.client.clone(),
        };

        let mut builder = client.request(to_reqwest_method(request.method), request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(payload) = request.body.clone() {
            let len = payload.len() as u64;
            request.progress.set_upload_total(len);
            builder = builder
                .header(CONTENT_LENGTH, len)
                .body(self.upload_body(payload, &request.progress));
        }

        tracing::debug!(method = %request.method, url = request.url, "sending request");
        let response = builder.send().await.map_err(|e| {
            if gate.as_ref().is_some_and(|gate| gate.rejected()) {
                NetworkError::CertificateRejected {
                    url: request.url.to_string(),
                }
            } else {
                map_error(&e, request.url)
            }
        })?;

        let status = response.status().as_u16();
        let headers = read_headers(response.headers());
        let content_length = response.content_length();
        let url = request.url.to_string();
        let body = response
            .bytes_stream()
            .map_err(move |e| map_error(&e, &url));

        Ok(TransportResponse {
            status,
            headers,
            content_length,
            body: Box::pin(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_headers_empty_is_none() {
        assert!(read_headers(&HeaderMap::new()).is_none());

        let mut map = HeaderMap::new();
        map.insert("x-test", "1".parse().unwrap());
        let headers = read_headers(&map).unwrap();
        assert_eq!(headers.get("X-Test"), Some("1"));
    }

    #[test]
    fn test_read_headers_joins_repeated_fields() {
        let mut map = HeaderMap::new();
        map.append("set-cookie", "a=1".parse().unwrap());
        map.append("set-cookie", "b=2".parse().unwrap());
        map.insert("content-type", "text/plain".parse().unwrap());

        let headers = read_headers(&map).unwrap();
        assert_eq!(headers.get("Set-Cookie"), Some("a=1, b=2"));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
    }

    #[test]
    fn test_gated_client_builds() {
        let client = NetClient::with_defaults().unwrap();
        let gate = Arc::new(CertificateGate::new(Arc::new(|_der: &[u8]| true)));
        assert!(client.gated(&gate).is_ok());
        assert!(!gate.rejected());
    }

    #[test]
    fn test_default_config() {
        let config = NetConfig::default();
        assert!(config.user_agent.starts_with("xfer/"));
        assert!(config.upload_chunk_size > 0);
    }
}
