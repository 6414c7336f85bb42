//! Network-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum NetworkError {
    #[error("connection timeout to {url}")]
    Timeout { url: String },

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("SSL/TLS error: {0}")]
    TlsError(String),

    #[error("certificate rejected for {url}")]
    CertificateRejected { url: String },

    #[error("Request aborted")]
    Aborted,
}

impl NetworkError {
    /// Build an error from a reqwest failure, keeping the timeout/connect split
    #[must_use]
    pub fn classify(message: String, url: &str, is_timeout: bool, is_connect: bool) -> Self {
        if is_timeout {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if is_connect {
            Self::ConnectionRefused(message)
        } else {
            Self::DownloadFailed(message)
        }
    }
}

impl UserFacingError for NetworkError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Timeout { .. } => Some("Increase the timeout with --timeout and retry."),
            Self::ConnectionRefused(_) => Some("Check that the host is reachable and retry."),
            Self::CertificateRejected { .. } | Self::TlsError(_) => {
                Some("Verify the server certificate or the configured validator.")
            }
            Self::HttpError { status: 401, .. } => Some("Check the supplied credentials."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionRefused(_) | Self::DownloadFailed(_) => true,
            Self::HttpError { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Timeout { .. } => "network.timeout",
            Self::DownloadFailed(_) => "network.download_failed",
            Self::ConnectionRefused(_) => "network.connection_refused",
            Self::InvalidUrl(_) => "network.invalid_url",
            Self::HttpError { .. } => "network.http_error",
            Self::TlsError(_) => "network.tls_error",
            Self::CertificateRejected { .. } => "network.certificate_rejected",
            Self::Aborted => "network.aborted",
        };
        Some(code)
    }
}
