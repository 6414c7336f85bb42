//! Body consumption: in memory or into a file

use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use xfer_errors::{DecodeError, NetworkError};

use crate::progress::ProgressState;
use crate::transport::ByteStream;

/// Why streaming a body into a file stopped
#[derive(Debug)]
pub(super) enum StreamError {
    /// The connection failed mid-body
    Network(NetworkError),
    /// The destination could not be written
    Write(DecodeError),
}

/// Removes the partial file unless the download was committed
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            committed: false,
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            // Best-effort cleanup - ignore errors
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Collect the whole body, counting downloaded bytes as they arrive
pub(super) async fn drain(mut body: ByteStream, state: &ProgressState) -> Result<Bytes, NetworkError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        state.add_downloaded(chunk.len() as u64);
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}

fn write_error(path: &Path, e: &std::io::Error) -> StreamError {
    StreamError::Write(DecodeError::new(
        "file",
        format!("{}: {e}", path.display()),
    ))
}

/// Stream the body into `dest` through a `.part` sibling
///
/// The destination only appears once every byte has been written and
/// flushed; on any failure the partial file is removed.
pub(super) async fn write_to_file(
    mut body: ByteStream,
    state: &ProgressState,
    dest: &Path,
) -> Result<u64, StreamError> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| write_error(parent, &e))?;
    }

    let mut part_name = dest.file_name().unwrap_or_default().to_os_string();
    part_name.push(".part");
    let part_path = dest.with_file_name(part_name);

    let mut guard = PartialFile::new(part_path.clone());
    let mut file = File::create(&part_path)
        .await
        .map_err(|e| write_error(&part_path, &e))?;

    let mut written = 0u64;
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(StreamError::Network)?;
        file.write_all(&chunk)
            .await
            .map_err(|e| write_error(&part_path, &e))?;
        written += chunk.len() as u64;
        state.add_downloaded(chunk.len() as u64);
    }

    file.flush().await.map_err(|e| write_error(&part_path, &e))?;
    file.sync_all().await.map_err(|e| write_error(&part_path, &e))?;
    drop(file);

    tokio::fs::rename(&part_path, dest)
        .await
        .map_err(|e| write_error(dest, &e))?;
    guard.committed = true;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(chunks: Vec<Result<Bytes, NetworkError>>) -> ByteStream {
        Box::pin(futures::stream::iter(chunks))
    }

    #[tokio::test]
    async fn test_drain_counts_bytes() {
        let state = ProgressState::new();
        let body = stream_of(vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ]);
        let bytes = drain(body, &state).await.unwrap();
        assert_eq!(bytes.as_ref(), b"hello world");
        assert_eq!(state.downloaded(), 11);
    }

    #[tokio::test]
    async fn test_write_to_file_commits() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("out.bin");
        let state = ProgressState::new();
        let body = stream_of(vec![Ok(Bytes::from_static(b"abc"))]);

        let written = write_to_file(body, &state, &dest).await.unwrap();
        assert_eq!(written, 3);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
        assert!(!dir.path().join("nested").join("out.bin.part").exists());
    }

    #[tokio::test]
    async fn test_write_to_file_cleans_up_on_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.bin");
        let state = ProgressState::new();
        let body = stream_of(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(NetworkError::DownloadFailed("reset".into())),
        ]);

        let result = write_to_file(body, &state, &dest).await;
        assert!(matches!(result, Err(StreamError::Network(_))));
        assert!(!dest.exists());
        assert!(!dir.path().join("out.bin.part").exists());
    }
}
