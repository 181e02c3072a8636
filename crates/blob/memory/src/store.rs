use std::collections::HashSet;
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use mediagate_blob::{BlobError, BlobLocation, BlobReader, BlobStore};

/// In-memory [`BlobStore`] backed by a [`DashMap`].
///
/// Readers hand out a cheap clone of the stored [`Bytes`], so a blob deleted
/// while a reader is open keeps streaming its old contents.
#[derive(Debug)]
pub struct MemoryBlobStore {
    disks: HashSet<String>,
    blobs: DashMap<BlobLocation, Bytes>,
}

impl MemoryBlobStore {
    /// Create a store with a single disk named `local`.
    pub fn new() -> Self {
        Self::with_disks(["local"])
    }

    /// Create a store exposing the given disk names.
    pub fn with_disks<I, S>(disks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            disks: disks.into_iter().map(Into::into).collect(),
            blobs: DashMap::new(),
        }
    }

    /// Number of stored blobs across all disks.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn location(&self, disk: &str, path: &str) -> Result<BlobLocation, BlobError> {
        if !self.disks.contains(disk) {
            return Err(BlobError::UnknownDisk(disk.to_owned()));
        }
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return Err(BlobError::InvalidPath(path.to_owned()));
        }
        Ok(BlobLocation::new(disk, path))
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn has_disk(&self, disk: &str) -> bool {
        self.disks.contains(disk)
    }

    async fn exists(&self, disk: &str, path: &str) -> Result<bool, BlobError> {
        let location = self.location(disk, path)?;
        Ok(self.blobs.contains_key(&location))
    }

    async fn open_read(&self, disk: &str, path: &str) -> Result<BlobReader, BlobError> {
        let location = self.location(disk, path)?;
        let data = self
            .blobs
            .get(&location)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| BlobError::NotFound(location.to_string()))?;
        Ok(Box::new(Cursor::new(data)))
    }

    async fn put(&self, disk: &str, path: &str, data: Bytes) -> Result<(), BlobError> {
        let location = self.location(disk, path)?;
        self.blobs.insert(location, data);
        Ok(())
    }

    async fn delete(&self, disk: &str, path: &str) -> Result<bool, BlobError> {
        let location = self.location(disk, path)?;
        Ok(self.blobs.remove(&location).is_some())
    }

    fn absolute_path(&self, disk: &str, path: &str) -> Result<String, BlobError> {
        let location = self.location(disk, path)?;
        Ok(format!("memory://{}/{}", location.disk, location.path))
    }
}
