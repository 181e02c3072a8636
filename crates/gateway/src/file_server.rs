use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use sha2::{Digest, Sha256};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, instrument, warn};

use mediagate_blob::{BlobError, BlobReader, BlobStore};
use mediagate_core::{CapabilityPayload, MediaError, MediaId, MediaItem};
use mediagate_repository::MediaRepository;

use crate::metrics::MediaMetrics;

/// Static caching policy for [`FileServer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileServerConfig {
    /// Cache-Control for non-expiring capabilities; `None` omits the header.
    pub cache_control: Option<String>,
    pub enable_etag: bool,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            cache_control: Some("private, max-age=3600".into()),
            enable_etag: true,
        }
    }
}

/// Outcome of a successful serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeStatus {
    /// 200 with a body.
    Ok,
    /// 304, conditional request matched the ETag.
    NotModified,
}

impl ServeStatus {
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotModified => 304,
        }
    }
}

/// Response headers decided before any byte is streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHeaders {
    pub content_type: String,
    pub content_length: u64,
    pub content_disposition: String,
    pub cache_control: Option<String>,
    pub etag: Option<String>,
}

/// A served file: status, headers and, for [`ServeStatus::Ok`], the body.
#[derive(Debug)]
pub struct ServedMedia {
    pub status: ServeStatus,
    pub headers: MediaHeaders,
    pub body: Option<MediaStream>,
}

/// Streams a media record's bytes out of the blob store.
#[derive(Clone)]
pub struct FileServer {
    repository: Arc<dyn MediaRepository>,
    blobs: Arc<dyn BlobStore>,
    config: FileServerConfig,
    metrics: Arc<MediaMetrics>,
}

impl std::fmt::Debug for FileServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FileServer {
    pub fn new(
        repository: Arc<dyn MediaRepository>,
        blobs: Arc<dyn BlobStore>,
        config: FileServerConfig,
    ) -> Self {
        Self {
            repository,
            blobs,
            config,
            metrics: Arc::new(MediaMetrics::default()),
        }
    }

    /// Share a metrics instance with other components.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MediaMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &FileServerConfig {
        &self.config
    }

    /// Serve a validated capability using the current time.
    pub async fn serve(
        &self,
        payload: &CapabilityPayload,
        if_none_match: Option<&str>,
    ) -> Result<ServedMedia, MediaError> {
        self.serve_at(payload, if_none_match, Utc::now().timestamp())
            .await
    }

    /// Serve a validated capability; `now` (unix seconds) drives Cache-Control.
    #[instrument(name = "file_server.serve", skip_all, fields(media_id = %payload.id, action = %payload.action))]
    pub async fn serve_at(
        &self,
        payload: &CapabilityPayload,
        if_none_match: Option<&str>,
        now: i64,
    ) -> Result<ServedMedia, MediaError> {
        let media = self
            .repository
            .find(&payload.id)
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?
            .ok_or_else(|| MediaError::MediaNotFound {
                id: payload.id.clone(),
            })?;

        let exists = self
            .blobs
            .exists(&media.disk, &media.path)
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;
        if !exists {
            return Err(self.missing_on_disk(&media));
        }

        let headers = self.headers(&media, payload, now);

        if let (Some(etag), Some(candidate)) = (headers.etag.as_deref(), if_none_match)
            && candidate.trim() == etag
        {
            self.metrics.increment_not_modified();
            debug!("conditional request matched, not modified");
            return Ok(ServedMedia {
                status: ServeStatus::NotModified,
                headers,
                body: None,
            });
        }

        let reader = match self.blobs.open_read(&media.disk, &media.path).await {
            Ok(reader) => reader,
            Err(BlobError::NotFound(_)) => return Err(self.missing_on_disk(&media)),
            Err(e) => {
                error!(disk = %media.disk, path = %media.path, error = %e, "failed to open media stream");
                self.metrics.increment_stream_errors();
                return Err(MediaError::StreamFailed);
            }
        };

        self.metrics.increment_served();
        Ok(ServedMedia {
            status: ServeStatus::Ok,
            headers,
            body: Some(MediaStream::new(
                reader,
                media.id.clone(),
                Arc::clone(&self.metrics),
            )),
        })
    }

    fn missing_on_disk(&self, media: &MediaItem) -> MediaError {
        warn!(
            media_id = %media.id,
            disk = %media.disk,
            path = %media.path,
            "media file missing on disk"
        );
        self.metrics.increment_missing_on_disk();
        MediaError::FileMissingOnDisk
    }

    fn headers(&self, media: &MediaItem, payload: &CapabilityPayload, now: i64) -> MediaHeaders {
        let cache_control = match payload.remaining_seconds(now) {
            Some(remaining) => Some(format!("private, max-age={remaining}")),
            None => self.config.cache_control.clone(),
        };

        MediaHeaders {
            content_type: media.content_type().to_owned(),
            content_length: media.size,
            content_disposition: format!(
                "{}; filename=\"{}\"",
                payload.action.disposition(),
                header_safe(&media.display_name())
            ),
            cache_control,
            etag: self.config.enable_etag.then(|| compute_etag(media)),
        }
    }
}

/// Quoted entity tag derived from the record id and its last modification.
pub fn compute_etag(media: &MediaItem) -> String {
    let digest = Sha256::digest(format!("{}:{}", media.id, media.updated_at.timestamp()));
    let hex = hex::encode(digest);
    format!("\"{}\"", &hex[..32])
}

fn header_safe(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '"' | '\\' | '\r' | '\n'))
        .collect()
}

/// Lazy, finite body of a served file.
///
/// Owns the blob reader until the stream ends, fails, or is dropped. A read
/// failure is logged and yielded once; the stream is finished afterwards.
pub struct MediaStream {
    inner: Option<ReaderStream<BlobReader>>,
    media_id: MediaId,
    metrics: Arc<MediaMetrics>,
}

impl MediaStream {
    fn new(reader: BlobReader, media_id: MediaId, metrics: Arc<MediaMetrics>) -> Self {
        Self {
            inner: Some(ReaderStream::new(reader)),
            media_id,
            metrics,
        }
    }

    /// Whether the underlying reader is still held.
    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("media_id", &self.media_id)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Stream for MediaStream {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Err(e))) => {
                error!(media_id = %this.media_id, error = %e, "media stream read failed");
                this.metrics.increment_stream_errors();
                this.inner = None;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.inner = None;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            Some(inner) => inner.size_hint(),
            None => (0, Some(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use futures::StreamExt;
    use mediagate_blob_memory::MemoryBlobStore;
    use mediagate_core::MediaAction;
    use mediagate_repository_memory::MemoryMediaRepository;
    use tokio::io::{AsyncRead, ReadBuf};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context as LayerContext, Layer, SubscriberExt};

    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn record(id: i64) -> MediaItem {
        let at = Utc.timestamp_opt(NOW - 100, 0).unwrap();
        MediaItem {
            id: MediaId::Int(id),
            path: format!("uploads/2026/10/{id}.pdf"),
            disk: "local".into(),
            filename: "annual-report".into(),
            formatted_filename: "annual-report.pdf".into(),
            extension: "pdf".into(),
            mime_type: Some("application/pdf".into()),
            size: 11,
            created_at: at,
            updated_at: at,
        }
    }

    async fn setup(config: FileServerConfig) -> (FileServer, Arc<MemoryMediaRepository>, Arc<MemoryBlobStore>) {
        let repo = Arc::new(MemoryMediaRepository::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let media = record(42);
        blobs
            .put(&media.disk, &media.path, Bytes::from_static(b"hello world"))
            .await
            .unwrap();
        repo.insert(media);
        let server = FileServer::new(repo.clone(), blobs.clone(), config);
        (server, repo, blobs)
    }

    async fn collect(stream: MediaStream) -> Vec<u8> {
        let chunks: Vec<_> = stream.collect().await;
        chunks
            .into_iter()
            .flat_map(|chunk| chunk.unwrap().to_vec())
            .collect()
    }

    #[tokio::test]
    async fn serves_download_with_attachment_headers() {
        let (server, _, _) = setup(FileServerConfig::default()).await;
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::Download, None);

        let served = server.serve_at(&payload, None, NOW).await.unwrap();
        assert_eq!(served.status, ServeStatus::Ok);
        assert_eq!(served.status.code(), 200);
        assert_eq!(
            served.headers.content_disposition,
            "attachment; filename=\"annual-report.pdf\""
        );
        assert_eq!(served.headers.content_type, "application/pdf");
        assert_eq!(served.headers.content_length, 11);
        assert_eq!(
            served.headers.cache_control.as_deref(),
            Some("private, max-age=3600")
        );
        assert_eq!(collect(served.body.unwrap()).await, b"hello world");
    }

    #[tokio::test]
    async fn view_is_inline() {
        let (server, _, _) = setup(FileServerConfig::default()).await;
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::View, None);
        let served = server.serve_at(&payload, None, NOW).await.unwrap();
        assert!(served.headers.content_disposition.starts_with("inline; "));
    }

    #[tokio::test]
    async fn expiring_capability_sets_remaining_max_age() {
        let (server, _, _) = setup(FileServerConfig::default()).await;
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::View, Some(NOW + 90));
        let served = server.serve_at(&payload, None, NOW).await.unwrap();
        assert_eq!(
            served.headers.cache_control.as_deref(),
            Some("private, max-age=90")
        );
    }

    #[tokio::test]
    async fn cache_control_can_be_omitted() {
        let (server, _, _) = setup(FileServerConfig {
            cache_control: None,
            enable_etag: false,
        })
        .await;
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::View, None);
        let served = server.serve_at(&payload, None, NOW).await.unwrap();
        assert_eq!(served.headers.cache_control, None);
        assert_eq!(served.headers.etag, None);
    }

    #[tokio::test]
    async fn matching_etag_yields_not_modified() {
        let (server, _, _) = setup(FileServerConfig::default()).await;
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::View, None);

        let first = server.serve_at(&payload, None, NOW).await.unwrap();
        let etag = first.headers.etag.clone().unwrap();
        assert!(etag.starts_with('"') && etag.ends_with('"'));
        assert_eq!(etag.len(), 34);

        let second = server.serve_at(&payload, Some(&etag), NOW).await.unwrap();
        assert_eq!(second.status, ServeStatus::NotModified);
        assert!(second.body.is_none());
        assert_eq!(second.headers, first.headers);

        let other = server
            .serve_at(&payload, Some("\"something-else\""), NOW)
            .await
            .unwrap();
        assert_eq!(other.status, ServeStatus::Ok);
        assert_eq!(collect(other.body.unwrap()).await, b"hello world");
    }

    #[test]
    fn etag_changes_with_updated_at() {
        let mut media = record(1);
        let before = compute_etag(&media);
        assert_eq!(before, compute_etag(&media));
        media.updated_at = media.updated_at + chrono::Duration::seconds(1);
        assert_ne!(before, compute_etag(&media));
    }

    #[tokio::test]
    async fn etag_ignored_when_disabled() {
        let (server, _, _) = setup(FileServerConfig {
            cache_control: None,
            enable_etag: false,
        })
        .await;
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::View, None);
        let etag = compute_etag(&record(42));
        let served = server.serve_at(&payload, Some(&etag), NOW).await.unwrap();
        assert_eq!(served.status, ServeStatus::Ok);
    }

    #[tokio::test]
    async fn unknown_record_is_not_found() {
        let (server, _, _) = setup(FileServerConfig::default()).await;
        let payload = CapabilityPayload::new(MediaId::Int(7), MediaAction::View, None);
        let err = server.serve_at(&payload, None, NOW).await.unwrap_err();
        assert!(matches!(err, MediaError::MediaNotFound { .. }));
        assert_eq!(err.status(), 404);
    }

    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn missing_blob_warns_once() {
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let _guard = tracing::subscriber::set_default(subscriber);

        let (server, _, blobs) = setup(FileServerConfig::default()).await;
        let media = record(42);
        blobs.delete(&media.disk, &media.path).await.unwrap();

        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::View, None);
        let err = server.serve_at(&payload, None, NOW).await.unwrap_err();
        assert!(matches!(err, MediaError::FileMissingOnDisk));
        assert_eq!(err.status(), 404);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert_eq!(server.metrics.snapshot().missing_on_disk, 1);
    }

    /// Reader that yields `good` bytes, then fails; `token` tracks liveness.
    struct FailingReader {
        good: Vec<u8>,
        _token: Arc<()>,
    }

    impl AsyncRead for FailingReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.good.is_empty() {
                return Poll::Ready(Err(io::Error::other("disk went away")));
            }
            let n = self.good.len().min(buf.remaining());
            let chunk: Vec<u8> = self.good.drain(..n).collect();
            buf.put_slice(&chunk);
            Poll::Ready(Ok(()))
        }
    }

    /// Store whose blobs always exist and read through a [`FailingReader`].
    struct FlakyStore {
        token: Arc<()>,
        open_error: bool,
    }

    #[async_trait]
    impl BlobStore for FlakyStore {
        fn has_disk(&self, _disk: &str) -> bool {
            true
        }

        async fn exists(&self, _disk: &str, _path: &str) -> Result<bool, BlobError> {
            Ok(true)
        }

        async fn open_read(&self, _disk: &str, _path: &str) -> Result<BlobReader, BlobError> {
            if self.open_error {
                return Err(BlobError::Storage("permission denied".into()));
            }
            Ok(Box::new(FailingReader {
                good: b"partial".to_vec(),
                _token: Arc::clone(&self.token),
            }))
        }

        async fn put(&self, _disk: &str, _path: &str, _data: Bytes) -> Result<(), BlobError> {
            Ok(())
        }

        async fn delete(&self, _disk: &str, _path: &str) -> Result<bool, BlobError> {
            Ok(true)
        }

        fn absolute_path(&self, disk: &str, path: &str) -> Result<String, BlobError> {
            Ok(format!("flaky://{disk}/{path}"))
        }
    }

    fn flaky(open_error: bool) -> (FileServer, Arc<()>) {
        let repo = Arc::new(MemoryMediaRepository::new());
        repo.insert(record(42));
        let token = Arc::new(());
        let store = Arc::new(FlakyStore {
            token: Arc::clone(&token),
            open_error,
        });
        (
            FileServer::new(repo, store, FileServerConfig::default()),
            token,
        )
    }

    #[tokio::test]
    async fn mid_stream_failure_ends_stream_with_error() {
        let (server, token) = flaky(false);
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::Download, None);
        let mut body = server.serve_at(&payload, None, NOW).await.unwrap().body.unwrap();

        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from_static(b"partial"));
        assert!(body.next().await.unwrap().is_err());
        assert!(!body.is_open());
        assert_eq!(Arc::strong_count(&token), 1, "reader released after failure");
        assert!(body.next().await.is_none());
        assert_eq!(server.metrics.snapshot().stream_errors, 1);
    }

    #[tokio::test]
    async fn early_drop_releases_reader() {
        let (server, token) = flaky(false);
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::Download, None);
        let body = server.serve_at(&payload, None, NOW).await.unwrap().body.unwrap();
        assert_eq!(Arc::strong_count(&token), 2);
        drop(body);
        assert_eq!(Arc::strong_count(&token), 1);
    }

    #[tokio::test]
    async fn completed_stream_releases_reader() {
        let (server, _, _) = setup(FileServerConfig::default()).await;
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::View, None);
        let mut body = server.serve_at(&payload, None, NOW).await.unwrap().body.unwrap();
        while body.next().await.is_some() {}
        assert!(!body.is_open());
    }

    #[tokio::test]
    async fn open_failure_is_stream_failed() {
        let (server, _) = flaky(true);
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::View, None);
        let err = server.serve_at(&payload, None, NOW).await.unwrap_err();
        assert!(matches!(err, MediaError::StreamFailed));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn disposition_filename_is_header_safe() {
        assert_eq!(header_safe("a\"b\\c\r\nd.pdf"), "abcd.pdf");
    }
}
