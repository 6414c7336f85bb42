//! Mapping transfer outcomes onto [`Response`] values

use bytes::Bytes;
use xfer_errors::{DecodeError, NetworkError};

use crate::request::Headers;
use crate::response::{Response, INVALID_CREDENTIALS, INVALID_HEADERS};

/// What the body of a successful exchange turned into
#[derive(Debug)]
pub(super) enum Payload {
    /// Kept in memory for the caller
    Buffered(Bytes),
    /// Taken by a file or media handler
    Consumed,
}

/// Everything that can happen to one transfer
#[derive(Debug)]
pub(super) enum Outcome {
    Aborted,
    /// No usable response: connection failure, TLS rejection, reset mid-body
    Failed { status: u16, error: NetworkError },
    /// The server answered with status >= 400
    Protocol {
        status: u16,
        headers: Option<Headers>,
        body: Bytes,
    },
    /// The handler could not interpret a successful body
    Decode {
        status: u16,
        error: DecodeError,
        data: Bytes,
    },
    Completed { status: u16, payload: Payload },
}

pub(super) fn classify(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Aborted => Response::failure(0, NetworkError::Aborted.to_string()),
        Outcome::Failed { status, error } => Response::failure(status, error.to_string()),
        Outcome::Protocol { status: 401, .. } => Response::failure(401, INVALID_CREDENTIALS),
        Outcome::Protocol {
            status,
            headers,
            body,
        } => match headers.filter(|h| !h.is_empty()) {
            None => Response::failure(status, INVALID_HEADERS),
            Some(headers) => Response::failure(status, protocol_message(&headers, &body)),
        },
        Outcome::Decode {
            status,
            error,
            data,
        } => Response::decode_failure(status, error.to_string(), data),
        Outcome::Completed {
            status,
            payload: Payload::Buffered(data),
        } => Response::success(status, String::from_utf8_lossy(&data).into_owned(), data),
        Outcome::Completed {
            status,
            payload: Payload::Consumed,
        } => Response::success(status, String::new(), Bytes::new()),
    }
}

/// One `name: value` line per header, then the body text
fn protocol_message(headers: &Headers, body: &[u8]) -> String {
    let mut message = String::new();
    for (name, value) in headers.iter() {
        message.push_str(name);
        message.push_str(": ");
        message.push_str(value);
        message.push('\n');
    }
    message.push_str(&String::from_utf8_lossy(body));
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers() -> Option<Headers> {
        Some([("Content-Type", "text/plain")].into_iter().collect())
    }

    #[test]
    fn test_unauthorized_wins_over_missing_headers() {
        let response = classify(Outcome::Protocol {
            status: 401,
            headers: None,
            body: Bytes::from_static(b"denied"),
        });
        assert_eq!(response.error(), INVALID_CREDENTIALS);
        assert_eq!(response.status(), 401);
    }

    #[test]
    fn test_missing_headers() {
        let response = classify(Outcome::Protocol {
            status: 500,
            headers: Some(Headers::new()),
            body: Bytes::new(),
        });
        assert_eq!(response.error(), INVALID_HEADERS);
        assert_eq!(response.status(), 500);
    }

    #[test]
    fn test_protocol_message_has_headers_and_body() {
        let response = classify(Outcome::Protocol {
            status: 404,
            headers: headers(),
            body: Bytes::from_static(b"not here"),
        });
        assert_eq!(response.error(), "Content-Type: text/plain\nnot here");
        assert_eq!(response.status(), 404);
    }

    #[test]
    fn test_buffered_success() {
        let response = classify(Outcome::Completed {
            status: 200,
            payload: Payload::Buffered(Bytes::from_static(b"ok")),
        });
        assert!(response.is_success());
        assert_eq!(response.text(), "ok");
        assert_eq!(response.data().as_ref(), b"ok");
        assert!(response.error().is_empty());
    }

    #[test]
    fn test_consumed_success_is_empty() {
        let response = classify(Outcome::Completed {
            status: 200,
            payload: Payload::Consumed,
        });
        assert!(response.is_success());
        assert!(response.text().is_empty());
        assert!(response.data().is_empty());
    }

    #[test]
    fn test_aborted_and_failed() {
        let response = classify(Outcome::Aborted);
        assert_eq!(response.error(), "Request aborted");
        assert_eq!(response.status(), 0);

        let response = classify(Outcome::Failed {
            status: 0,
            error: NetworkError::ConnectionRefused("nobody home".into()),
        });
        assert!(!response.is_success());
        assert!(response.error().contains("nobody home"));
    }
}
