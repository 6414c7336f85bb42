//! Transfer descriptions handed to the dispatcher

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use bytes::Bytes;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use xfer_errors::Error;

use crate::handler::ResponseHandler;
use crate::progress::ProgressSink;
use crate::transport::CertificateValidator;

pub(crate) const CONTENT_TYPE: &str = "Content-Type";

/// HTTP verbs supported by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }

    /// POST and PUT carry a payload; progress is measured on the upload side
    #[must_use]
    pub fn is_upload(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header mapping with case-insensitive unique keys
///
/// Inserting a key that differs from an existing one only in ASCII case
/// replaces that entry. Iteration order is insertion order but carries no
/// meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a header, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => {
                let (_, previous) =
                    std::mem::replace(&mut self.entries[index], (name, value));
                Some(previous)
            }
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Add a value, joining it to an existing one with `, ` as HTTP allows
    /// for repeated fields
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(index) => {
                let existing = &mut self.entries[index].1;
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|index| self.entries[index].1.as_str())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|index| self.entries.remove(index).1)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Request payload; the three representations are mutually exclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Bytes(Bytes),
    /// Fields sent as `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
}

impl Body {
    /// Wire representation of the payload
    #[must_use]
    pub fn encode(&self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
            Self::Bytes(bytes) => bytes.clone(),
            Self::Form(fields) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish();
                Bytes::from(encoded)
            }
        }
    }

    /// Content type implied by the representation, if any
    #[must_use]
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            Self::Form(_) => Some("application/x-www-form-urlencoded"),
            Self::Text(_) | Self::Bytes(_) => None,
        }
    }
}

/// One transfer: built per call and consumed by [`crate::RequestDispatcher::send`]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: Headers,
    pub(crate) body: Option<Body>,
    pub(crate) timeout_secs: i64,
    pub(crate) certificate_validator: Option<Arc<dyn CertificateValidator>>,
    pub(crate) cancel: CancellationToken,
    pub(crate) progress: Option<Arc<dyn ProgressSink>>,
    pub(crate) handler: ResponseHandler,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
            timeout_secs: 0,
            certificate_validator: None,
            cancel: CancellationToken::new(),
            progress: None,
            handler: ResponseHandler::Buffered,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in headers {
            self.headers.insert(name, value);
        }
        self
    }

    /// `Authorization: Bearer <token>`
    #[must_use]
    pub fn bearer_auth(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// `Authorization: Basic base64(user:password)`
    #[must_use]
    pub fn basic_auth(self, user: &str, password: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
        self.header("Authorization", format!("Basic {encoded}"))
    }

    #[must_use]
    pub fn body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn text(self, text: impl Into<String>) -> Self {
        self.body(Body::Text(text.into()))
    }

    #[must_use]
    pub fn bytes(self, bytes: impl Into<Bytes>) -> Self {
        self.body(Body::Bytes(bytes.into()))
    }

    #[must_use]
    pub fn form<K: Into<String>, V: Into<String>>(
        self,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.body(Body::Form(fields))
    }

    /// Serialize `value` as the text body and mark it `application/json`
    ///
    /// # Errors
    ///
    /// Returns an error if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, Error> {
        let text = serde_json::to_string(value)?;
        Ok(self.header(CONTENT_TYPE, "application/json").text(text))
    }

    /// Per-request timeout in seconds; zero or negative keeps the transport default
    #[must_use]
    pub fn timeout_secs(mut self, secs: i64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Hand a certificate validator to the transfer; it is dropped when the call ends
    #[must_use]
    pub fn certificate_validator(mut self, validator: impl CertificateValidator + 'static) -> Self {
        self.certificate_validator = Some(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    #[must_use]
    pub fn progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    #[must_use]
    pub fn on_progress(self, callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.progress(Arc::new(callback))
    }

    #[must_use]
    pub fn handler(mut self, handler: ResponseHandler) -> Self {
        self.handler = handler;
        self
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn header_map(&self) -> &Headers {
        &self.headers
    }

    #[must_use]
    pub fn payload(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Effective timeout override, `None` when the transport default applies
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        timeout_override(self.timeout_secs)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout_secs", &self.timeout_secs)
            .field("certificate_validator", &self.certificate_validator.is_some())
            .field("progress", &self.progress.is_some())
            .field("handler", &self.handler)
            .finish_non_exhaustive()
    }
}

pub(crate) fn timeout_override(secs: i64) -> Option<Duration> {
    u64::try_from(secs)
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_case_insensitive_unique() {
        let mut headers = Headers::new();
        headers.insert("Content-Type", "text/plain");
        let previous = headers.insert("content-type", "application/json");

        assert_eq!(previous.as_deref(), Some("text/plain"));
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(headers.remove("Content-type").as_deref(), Some("application/json"));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_append_joins_repeated_fields() {
        let mut headers = Headers::new();
        headers.append("Set-Cookie", "a=1");
        headers.append("set-cookie", "b=2");
        headers.append("Vary", "Accept");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("SET-COOKIE"), Some("a=1, b=2"));
        assert_eq!(headers.get("vary"), Some("Accept"));
    }

    #[test]
    fn test_form_body_is_urlencoded() {
        let body = Body::Form(vec![
            ("name".into(), "a b".into()),
            ("q".into(), "x&y".into()),
        ]);
        assert_eq!(body.encode(), Bytes::from_static(b"name=a+b&q=x%26y"));
        assert_eq!(
            body.default_content_type(),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_timeout_override() {
        assert_eq!(timeout_override(0), None);
        assert_eq!(timeout_override(-5), None);
        assert_eq!(timeout_override(7), Some(Duration::from_secs(7)));
        assert_eq!(Request::get("https://example.com").timeout(), None);
    }

    #[test]
    fn test_auth_headers() {
        let request = Request::get("https://example.com").basic_auth("user", "pass");
        assert_eq!(
            request.header_map().get("authorization"),
            Some("Basic dXNlcjpwYXNz")
        );

        let request = Request::get("https://example.com").bearer_auth("tok");
        assert_eq!(request.header_map().get("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn test_json_body() {
        let request = Request::post("https://example.com")
            .json(&serde_json::json!({"MyJsonProperty": "MyJsonValue"}))
            .unwrap();
        assert_eq!(request.header_map().get("content-type"), Some("application/json"));
        assert_eq!(
            request.payload(),
            Some(&Body::Text(r#"{"MyJsonProperty":"MyJsonValue"}"#.to_string()))
        );
    }
}
