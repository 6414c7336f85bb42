//! Response-handling strategies

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use xfer_errors::DecodeError;

/// Consumer that decodes a fully downloaded media payload
///
/// The dispatcher hands over the complete body exactly once, after a
/// successful status. Returning an error turns the response into a decode
/// failure that still carries the bytes.
pub trait MediaSink: Send {
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the payload is not valid for this sink.
    fn accept(&mut self, payload: Bytes) -> Result<(), DecodeError>;
}

/// How the body of a successful response is consumed
#[derive(Default)]
pub enum ResponseHandler {
    /// Keep the body in memory as text and raw bytes
    #[default]
    Buffered,
    /// Stream the body into this path
    StreamedToFile(PathBuf),
    StreamedToTexture(Box<dyn MediaSink>),
    StreamedToAudio(Box<dyn MediaSink>),
    StreamedToArchive(Box<dyn MediaSink>),
}

impl ResponseHandler {
    /// Short name used in logs and decode errors
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Buffered => "buffer",
            Self::StreamedToFile(_) => "file",
            Self::StreamedToTexture(_) => "texture",
            Self::StreamedToAudio(_) => "audio",
            Self::StreamedToArchive(_) => "archive",
        }
    }
}

impl fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StreamedToFile(path) => f.debug_tuple("StreamedToFile").field(path).finish(),
            other => f.write_str(other.kind()),
        }
    }
}
