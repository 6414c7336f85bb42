//! Payload decoding error types

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decode {kind}: {message}")]
pub struct DecodeError {
    /// Media kind being decoded ("texture", "archive", "file", ...)
    pub kind: String,
    pub message: String,
}

impl DecodeError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn user_code(&self) -> Option<&'static str> {
        Some("decode.failed")
    }
}
