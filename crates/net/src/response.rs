//! Uniform transfer outcome

use bytes::Bytes;
use serde::Serialize;
use xfer_errors::NetworkError;

/// Error text for a 401 response
pub const INVALID_CREDENTIALS: &str = "Invalid Credentials";

/// Error text for a protocol failure that carried no response headers
pub const INVALID_HEADERS: &str = "Invalid Headers";

/// Outcome of one transfer
///
/// Exactly one of two shapes holds: a success with a status and optional
/// payload (`error` empty), or a failure with non-empty `error` text. A
/// decode failure is the one failure shape that still carries the raw
/// downloaded bytes in [`Response::data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    success: bool,
    status: u16,
    text: String,
    #[serde(skip)]
    data: Bytes,
    error: String,
}

impl Response {
    #[must_use]
    pub fn success(status: u16, text: String, data: Bytes) -> Self {
        Self {
            success: true,
            status,
            text,
            data,
            error: String::new(),
        }
    }

    /// Failure without payload; an empty message is replaced so that a
    /// failure always explains itself
    #[must_use]
    pub fn failure(status: u16, error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error = format!("request failed with status {status}");
        }
        Self {
            success: false,
            status,
            text: String::new(),
            data: Bytes::new(),
            error,
        }
    }

    /// Decoding of a successful payload failed; the bytes are kept
    #[must_use]
    pub fn decode_failure(status: u16, error: impl Into<String>, data: Bytes) -> Self {
        Self {
            data,
            ..Self::failure(status, error)
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Convert into a `Result`, for callers that prefer `?`
    ///
    /// # Errors
    ///
    /// Returns a [`NetworkError`] carrying the status and error text when the
    /// transfer did not succeed.
    pub fn into_result(self) -> Result<Self, NetworkError> {
        if self.success {
            Ok(self)
        } else if self.error == NetworkError::Aborted.to_string() {
            Err(NetworkError::Aborted)
        } else if self.status == 0 {
            Err(NetworkError::DownloadFailed(self.error))
        } else {
            Err(NetworkError::HttpError {
                status: self.status,
                message: self.error,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_always_has_text() {
        let response = Response::failure(500, "");
        assert!(!response.is_success());
        assert!(!response.error().is_empty());
        assert!(response.data().is_empty());
    }

    #[test]
    fn test_decode_failure_keeps_bytes() {
        let response = Response::decode_failure(200, "bad image", Bytes::from_static(b"\x00\x01"));
        assert!(!response.is_success());
        assert_eq!(response.status(), 200);
        assert_eq!(response.data().as_ref(), b"\x00\x01");
    }

    #[test]
    fn test_into_result() {
        let ok = Response::success(200, "hi".into(), Bytes::from_static(b"hi"));
        assert!(ok.into_result().is_ok());

        let err = Response::failure(404, "nope").into_result().unwrap_err();
        assert_eq!(
            err,
            NetworkError::HttpError {
                status: 404,
                message: "nope".into()
            }
        );

        let err = Response::failure(0, "Request aborted").into_result().unwrap_err();
        assert_eq!(err, NetworkError::Aborted);
    }
}
