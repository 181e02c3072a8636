use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;

use mediagate_blob::{BlobError, BlobReader, BlobStore};

/// Filesystem [`BlobStore`] mapping disk names to root directories.
///
/// Paths are always interpreted relative to the disk root. Absolute paths and
/// any `..` component are rejected with [`BlobError::InvalidPath`], so a blob
/// path can never address a file outside its disk.
#[derive(Debug, Clone, Default)]
pub struct LocalBlobStore {
    roots: HashMap<String, PathBuf>,
}

impl LocalBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a disk rooted at `root`.
    #[must_use]
    pub fn with_disk(mut self, name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        self.roots.insert(name.into(), root.into());
        self
    }

    /// Configured disks and their roots.
    pub fn disks(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.roots.iter().map(|(name, root)| (name.as_str(), root.as_path()))
    }

    fn resolve(&self, disk: &str, path: &str) -> Result<PathBuf, BlobError> {
        let root = self
            .roots
            .get(disk)
            .ok_or_else(|| BlobError::UnknownDisk(disk.to_owned()))?;

        let relative = Path::new(path);
        let mut has_normal = false;
        for component in relative.components() {
            match component {
                Component::Normal(_) => has_normal = true,
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(BlobError::InvalidPath(path.to_owned()));
                }
            }
        }
        if !has_normal {
            return Err(BlobError::InvalidPath(path.to_owned()));
        }
        Ok(root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn has_disk(&self, disk: &str) -> bool {
        self.roots.contains_key(disk)
    }

    async fn exists(&self, disk: &str, path: &str) -> Result<bool, BlobError> {
        let full = self.resolve(disk, path)?;
        match fs::metadata(&full).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open_read(&self, disk: &str, path: &str) -> Result<BlobReader, BlobError> {
        let full = self.resolve(disk, path)?;
        match fs::File::open(&full).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(BlobError::NotFound(format!("{disk}:{path}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, disk: &str, path: &str, data: Bytes) -> Result<(), BlobError> {
        let full = self.resolve(disk, path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, &data).await?;
        debug!(disk, path, size = data.len(), "blob written");
        Ok(())
    }

    async fn delete(&self, disk: &str, path: &str) -> Result<bool, BlobError> {
        let full = self.resolve(disk, path)?;
        match fs::remove_file(&full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn absolute_path(&self, disk: &str, path: &str) -> Result<String, BlobError> {
        let full = self.resolve(disk, path)?;
        let absolute = if full.is_absolute() {
            full
        } else {
            std::env::current_dir()?.join(full)
        };
        Ok(absolute.to_string_lossy().into_owned())
    }
}
