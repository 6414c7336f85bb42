//! Integration tests for media acquisition

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use httpmock::prelude::*;
    use tempfile::{tempdir, TempDir};
    use xfer_cache::DownloadCache;
    use xfer_errors::DecodeError;
    use xfer_events::{channel, AcquisitionEvent, AppEvent, EventReceiver, GeneralEvent};
    use xfer_media::*;
    use xfer_net::{file_url, NetClient, RequestDispatcher};

    /// Accepts only payloads that start with the JPEG magic bytes
    struct Jpeg;

    impl MediaDecoder for Jpeg {
        type Output = Vec<u8>;

        fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
            if bytes.starts_with(&[0xFF, 0xD8]) {
                Ok(bytes.to_vec())
            } else {
                Err(DecodeError::new("texture", "missing JPEG marker"))
            }
        }

        fn encode(&self, output: &Vec<u8>) -> Result<Bytes, DecodeError> {
            Ok(Bytes::from(output.clone()))
        }
    }

    /// Decodes anything but cannot serialize its output back
    struct WriteOnce;

    impl MediaDecoder for WriteOnce {
        type Output = Vec<u8>;

        fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>, DecodeError> {
            Ok(bytes.to_vec())
        }

        fn encode(&self, _output: &Vec<u8>) -> Result<Bytes, DecodeError> {
            Err(DecodeError::new("texture", "no encoder for this format"))
        }
    }

    fn acquirer() -> (MediaAcquirer, EventReceiver, TempDir) {
        let temp = tempdir().unwrap();
        let (tx, rx) = channel();
        let dispatcher = Arc::new(RequestDispatcher::with_defaults().unwrap());
        let cache = Arc::new(DownloadCache::new(temp.path().join("cache")));
        let acquirer = MediaAcquirer::new(dispatcher, cache).with_events(tx);
        (acquirer, rx, temp)
    }

    fn acquisitions(rx: &mut EventReceiver) -> Vec<AcquisitionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::Acquisition(event) = event {
                events.push(event);
            }
        }
        events
    }

    fn general_errors(rx: &mut EventReceiver) -> Vec<String> {
        let mut errors = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let AppEvent::General(GeneralEvent::Error { message, .. }) = event {
                errors.push(message);
            }
        }
        errors
    }

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];

    #[tokio::test]
    async fn test_texture_second_fetch_comes_from_cache() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/img/photo.jpg");
                then.status(200).body(JPEG);
            })
            .await;
        let (acquirer, mut rx, _temp) = acquirer();
        let url = format!("{}?size=large", server.url("/img/photo.jpg"));

        let first = acquirer
            .acquire_asset(AssetKind::Texture, &url, Jpeg, AcquireOptions::default())
            .await;
        let second = acquirer
            .acquire_asset(AssetKind::Texture, &url, Jpeg, AcquireOptions::default())
            .await;

        assert_eq!(first.as_deref(), Some(JPEG));
        assert_eq!(second.as_deref(), Some(JPEG));
        assert_eq!(mock.hits_async().await, 1);
        assert!(acquirer.cache().root().join("photo.jpg").is_file());

        let events = acquisitions(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [
                AcquisitionEvent::Completed { from_cache: false, .. },
                AcquisitionEvent::Completed { from_cache: true, .. },
            ]
        ));
    }

    #[tokio::test]
    async fn test_failed_fetch_returns_none_and_logs() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.ogg");
                then.status(404).body("no such sound");
            })
            .await;
        let (acquirer, mut rx, _temp) = acquirer();
        let url = server.url("/missing.ogg");

        let result = acquirer
            .acquire_asset(AssetKind::Audio, &url, RawBytes, AcquireOptions::default())
            .await;
        assert!(result.is_none());
        assert!(!acquirer.cache().root().join("missing.ogg").exists());

        let events = acquisitions(&mut rx);
        match events.as_slice() {
            [AcquisitionEvent::Failed {
                kind,
                url: failed_url,
                status,
                body,
            }] => {
                assert_eq!(kind, "audio");
                assert_eq!(failed_url, &url);
                assert_eq!(*status, 404);
                assert!(body.contains("no such sound"));
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_decode_failure_is_not_cached() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/fake.jpg");
                then.status(200).body("plain text");
            })
            .await;
        let (acquirer, _rx, _temp) = acquirer();

        let result = acquirer
            .acquire_asset(
                AssetKind::Texture,
                &server.url("/fake.jpg"),
                Jpeg,
                AcquireOptions::default(),
            )
            .await;
        assert!(result.is_none());
        assert!(!acquirer.cache().root().join("fake.jpg").exists());
    }

    #[tokio::test]
    async fn test_archive_with_extensionless_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/bundles/latest");
                then.status(200).body("bundle-bytes");
            })
            .await;
        let (acquirer, _rx, _temp) = acquirer();
        let url = server.url("/bundles/latest");

        let first = acquirer
            .acquire_archive(&url, RawBytes, AcquireOptions::default())
            .await;
        let second = acquirer
            .acquire_archive(&url, RawBytes, AcquireOptions::default())
            .await;

        assert_eq!(first, Some(Bytes::from_static(b"bundle-bytes")));
        assert_eq!(second, first);
        assert_eq!(mock.hits_async().await, 1);
        assert!(acquirer
            .cache()
            .root()
            .join(xfer_cache::file_name(&url))
            .is_file());
    }

    #[tokio::test]
    async fn test_file_is_streamed_into_cache() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/docs/readme.txt");
                then.status(200).body("read me");
            })
            .await;
        let (acquirer, _rx, _temp) = acquirer();
        let url = server.url("/docs/readme.txt");

        let path = acquirer
            .acquire_file(&url, AcquireOptions::default())
            .await
            .unwrap();
        assert_eq!(path, acquirer.cache().root().join("readme.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"read me");

        let again = acquirer
            .acquire_file(&url, AcquireOptions::default())
            .await
            .unwrap();
        assert_eq!(again, path);
        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn test_local_file_url_skips_network() {
        let (acquirer, _rx, temp) = acquirer();
        let path = temp.path().join("local.jpg");
        std::fs::write(&path, JPEG).unwrap();
        let url = file_url(&path).unwrap();

        let texture = acquirer
            .acquire_asset(AssetKind::Texture, &url, Jpeg, AcquireOptions::default())
            .await;
        assert_eq!(texture.as_deref(), Some(JPEG));
        assert!(!acquirer.cache().root().join("local.jpg").exists());

        let file = acquirer.acquire_file(&url, AcquireOptions::default()).await;
        assert_eq!(file, Some(path));

        let missing = file_url(&temp.path().join("gone.bin")).unwrap();
        assert!(acquirer
            .acquire_file(&missing, AcquireOptions::default())
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_progress_reaches_100() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tone.wav");
                then.status(200).body(vec![0u8; 64 * 1024]);
            })
            .await;
        let (acquirer, _rx, _temp) = acquirer();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let options = AcquireOptions::default().progress(Arc::new(move |p: f32| {
            sink_seen.lock().unwrap().push(p);
        }));

        let audio = acquirer
            .acquire_asset(AssetKind::Audio, &server.url("/tone.wav"), RawBytes, options)
            .await;
        assert_eq!(audio.map(|a| a.len()), Some(64 * 1024));
        assert_eq!(seen.lock().unwrap().last().copied(), Some(100.0));
    }

    #[tokio::test]
    async fn test_unwritable_cache_entry_is_not_fatal() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/img/photo.jpg");
                then.status(200).body(JPEG);
            })
            .await;
        let (acquirer, mut rx, _temp) = acquirer();
        std::fs::create_dir_all(acquirer.cache().root().join("photo.jpg.part")).unwrap();
        let url = server.url("/img/photo.jpg");

        let first = acquirer
            .acquire_asset(AssetKind::Texture, &url, Jpeg, AcquireOptions::default())
            .await;
        assert_eq!(first.as_deref(), Some(JPEG));
        assert!(!acquirer.cache().root().join("photo.jpg").exists());
        let errors = general_errors(&mut rx);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("could not cache texture"));

        let second = acquirer
            .acquire_asset(AssetKind::Texture, &url, Jpeg, AcquireOptions::default())
            .await;
        assert_eq!(second.as_deref(), Some(JPEG));
        assert_eq!(mock.hits_async().await, 2);
    }

    #[tokio::test]
    async fn test_encode_failure_is_not_fatal() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/img/raw.bmp");
                then.status(200).body("pixels");
            })
            .await;
        let (acquirer, mut rx, _temp) = acquirer();

        let texture = acquirer
            .acquire_asset(
                AssetKind::Texture,
                &server.url("/img/raw.bmp"),
                WriteOnce,
                AcquireOptions::default(),
            )
            .await;

        assert_eq!(texture.as_deref(), Some(&b"pixels"[..]));
        assert!(!acquirer.cache().root().join("raw.bmp").exists());
        assert_eq!(general_errors(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_over_plain_network_client() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/img/photo.jpg");
                then.status(200).body(JPEG);
            })
            .await;
        let temp = tempdir().unwrap();
        let (tx, mut rx) = channel();
        let dispatcher = Arc::new(RequestDispatcher::new(NetClient::with_defaults().unwrap()));
        let cache = Arc::new(DownloadCache::new(temp.path().join("cache")));
        let acquirer = MediaAcquirer::new(dispatcher, cache).with_events(tx);
        let url = server.url("/img/photo.jpg");

        for _ in 0..2 {
            let image = acquirer
                .acquire_asset(AssetKind::Texture, &url, Jpeg, AcquireOptions::default())
                .await;
            assert_eq!(image.as_deref(), Some(JPEG));
        }

        assert_eq!(mock.hits_async().await, 1);
        let events = acquisitions(&mut rx);
        assert!(matches!(
            events.as_slice(),
            [
                AcquisitionEvent::Completed { from_cache: false, .. },
                AcquisitionEvent::Completed { from_cache: true, .. },
            ]
        ));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_live_jpeg_twice() {
        let (acquirer, mut rx, _temp) = acquirer();
        let url = "https://httpbin.org/image/jpeg";

        for _ in 0..2 {
            let image = acquirer
                .acquire_asset(AssetKind::Texture, url, Jpeg, AcquireOptions::default())
                .await;
            assert!(image.is_some());
        }
        let events = acquisitions(&mut rx);
        assert!(matches!(
            events.last(),
            Some(AcquisitionEvent::Completed { from_cache: true, .. })
        ));
    }
}
