//! URL validation ahead of dispatch

use url::Url;
use xfer_errors::NetworkError;

/// Reject URLs that are malformed or use a scheme no transport can serve
pub(super) fn validate_url(url: &str) -> Result<(), NetworkError> {
    let parsed = Url::parse(url).map_err(|e| NetworkError::InvalidUrl(format!("{url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" | "file" => Ok(()),
        scheme => Err(NetworkError::InvalidUrl(format!(
            "unsupported scheme {scheme} in {url}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_schemes() {
        assert!(validate_url("https://example.com/a").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(validate_url("file:///tmp/a.png").is_ok());
    }

    #[test]
    fn test_rejected_urls() {
        assert!(validate_url("ftp://example.com/a").is_err());
        assert!(validate_url("example.com/a").is_err());
        assert!(validate_url("").is_err());
    }
}
