use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::error::BlobError;

/// An open read handle on a blob.
///
/// Dropping the reader releases the underlying handle (file descriptor,
/// network connection, ...), so callers get scoped release on every exit
/// path by simply letting it go out of scope.
pub type BlobReader = Box<dyn AsyncRead + Send + Unpin>;

/// Pluggable storage backend for media file bytes.
///
/// Blobs are addressed by a named disk and a path relative to that disk.
/// Implementors provide the actual storage mechanism (memory, local
/// filesystem, object storage).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether `disk` is configured on this store.
    fn has_disk(&self, disk: &str) -> bool;

    /// Whether a blob exists at `path` on `disk`.
    async fn exists(&self, disk: &str, path: &str) -> Result<bool, BlobError>;

    /// Open a streaming reader on a blob.
    ///
    /// Returns [`BlobError::NotFound`] when the blob does not exist.
    async fn open_read(&self, disk: &str, path: &str) -> Result<BlobReader, BlobError>;

    /// Store `data` at `path`, replacing any existing blob.
    async fn put(&self, disk: &str, path: &str, data: Bytes) -> Result<(), BlobError>;

    /// Delete a blob. Returns `true` if the blob existed.
    async fn delete(&self, disk: &str, path: &str) -> Result<bool, BlobError>;

    /// Backend-specific absolute location of a blob (a filesystem path for
    /// local disks, a URI for others).
    fn absolute_path(&self, disk: &str, path: &str) -> Result<String, BlobError>;
}
