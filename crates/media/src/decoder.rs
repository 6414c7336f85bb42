//! Payload decoders and the sink that feeds them

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::oneshot;
use xfer_errors::DecodeError;
use xfer_net::MediaSink;

/// Turns a downloaded payload into a typed value and back
///
/// `encode` produces the bytes written to the cache, so a later cache hit
/// decodes to an equivalent value.
pub trait MediaDecoder: Send + Sync + 'static {
    type Output: Send + 'static;

    /// # Errors
    ///
    /// Returns a [`DecodeError`] when `bytes` is not a valid payload.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Output, DecodeError>;

    /// # Errors
    ///
    /// Returns a [`DecodeError`] when `output` cannot be serialized.
    fn encode(&self, output: &Self::Output) -> Result<Bytes, DecodeError>;
}

/// Passthrough decoder: the payload is the value
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytes;

impl MediaDecoder for RawBytes {
    type Output = Bytes;

    fn decode(&self, bytes: &[u8]) -> Result<Bytes, DecodeError> {
        Ok(Bytes::copy_from_slice(bytes))
    }

    fn encode(&self, output: &Bytes) -> Result<Bytes, DecodeError> {
        Ok(output.clone())
    }
}

/// Decodes the payload handed over by the dispatcher and passes the value
/// back to the waiting acquirer
pub(crate) struct DecodeSlot<D: MediaDecoder> {
    decoder: Arc<D>,
    tx: Option<oneshot::Sender<D::Output>>,
}

impl<D: MediaDecoder> DecodeSlot<D> {
    pub(crate) fn new(decoder: Arc<D>) -> (Self, oneshot::Receiver<D::Output>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                decoder,
                tx: Some(tx),
            },
            rx,
        )
    }
}

impl<D: MediaDecoder> MediaSink for DecodeSlot<D> {
    fn accept(&mut self, payload: Bytes) -> Result<(), DecodeError> {
        let output = self.decoder.decode(&payload)?;
        if let Some(tx) = self.tx.take() {
            // The acquirer may have given up waiting; nothing to do then
            let _ = tx.send(output);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Utf8;

    impl MediaDecoder for Utf8 {
        type Output = String;

        fn decode(&self, bytes: &[u8]) -> Result<String, DecodeError> {
            String::from_utf8(bytes.to_vec()).map_err(|e| DecodeError::new("text", e.to_string()))
        }

        fn encode(&self, output: &String) -> Result<Bytes, DecodeError> {
            Ok(Bytes::from(output.clone()))
        }
    }

    #[tokio::test]
    async fn test_slot_delivers_decoded_value() {
        let (mut slot, rx) = DecodeSlot::new(Arc::new(Utf8));
        slot.accept(Bytes::from_static(b"caf\xc3\xa9")).unwrap();
        assert_eq!(rx.await.unwrap(), "café");
    }

    #[test]
    fn test_slot_reports_decode_error() {
        let (mut slot, mut rx) = DecodeSlot::new(Arc::new(Utf8));
        let err = slot.accept(Bytes::from_static(b"\xff\xfe")).unwrap_err();
        assert_eq!(err.kind, "text");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_raw_bytes_is_identity() {
        let bytes = Bytes::from_static(b"\x00\x01\x02");
        let decoded = RawBytes.decode(&bytes).unwrap();
        assert_eq!(RawBytes.encode(&decoded).unwrap(), bytes);
    }
}
