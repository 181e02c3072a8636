use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use mediagate_blob::BlobStore;
use mediagate_core::{MediaError, MediaItem, NewMediaItem, media::DEFAULT_MIME_TYPE, sanitize_filename};

/// Where uploads land.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub default_disk: String,
    /// Directory prefix inside the disk for every upload.
    pub base_dir: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            default_disk: "local".into(),
            base_dir: "uploads".into(),
        }
    }
}

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-side file name, including extension.
    pub original_name: String,
    /// MIME type claimed by the client.
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Result of writing an [`UploadedFile`] to the blob store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub disk: String,
    pub filename: String,
    pub formatted_filename: String,
    pub extension: String,
    pub mime_type: Option<String>,
    pub size: u64,
}

impl StoredFile {
    /// Replace the display name, keeping the extension.
    pub fn rename(&mut self, name: &str) {
        self.filename = sanitize_filename(name);
        self.formatted_filename = if self.extension.is_empty() {
            self.filename.clone()
        } else {
            format!("{}.{}", self.filename, self.extension)
        };
    }
}

impl From<StoredFile> for NewMediaItem {
    fn from(file: StoredFile) -> Self {
        Self {
            path: file.path,
            disk: file.disk,
            filename: file.filename,
            formatted_filename: file.formatted_filename,
            extension: file.extension,
            mime_type: file.mime_type,
            size: file.size,
        }
    }
}

/// Writes uploads into date-bucketed blob paths and removes them again.
#[derive(Clone)]
pub struct Uploader {
    blobs: Arc<dyn BlobStore>,
    config: UploadConfig,
}

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Uploader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Uploader {
    pub fn new(blobs: Arc<dyn BlobStore>, config: UploadConfig) -> Self {
        Self { blobs, config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Store `file` under `{base_dir}[/{directory}]/{YYYY}/{MM}/{uuid}[.ext]`.
    pub async fn upload(
        &self,
        file: UploadedFile,
        directory: Option<&str>,
        disk: Option<&str>,
    ) -> Result<StoredFile, MediaError> {
        self.upload_at(file, directory, disk, Utc::now()).await
    }

    #[instrument(name = "uploader.upload", skip_all, fields(original_name = %file.original_name))]
    pub async fn upload_at(
        &self,
        file: UploadedFile,
        directory: Option<&str>,
        disk: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<StoredFile, MediaError> {
        let disk = disk.unwrap_or(&self.config.default_disk).to_owned();
        if !self.blobs.has_disk(&disk) {
            error!(%disk, "upload targets an unknown disk");
            return Err(MediaError::UploadFailed);
        }

        let original = Path::new(&file.original_name);
        let extension = original
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = original
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        let path = self.blob_path(directory, &extension, now);
        let mime_type = detect_mime(file.content_type.as_deref(), &file.original_name);
        let size = file.data.len() as u64;

        self.blobs.put(&disk, &path, file.data).await.map_err(|e| {
            error!(%disk, %path, error = %e, "failed to write upload");
            MediaError::UploadFailed
        })?;
        info!(%disk, %path, size, "file uploaded");

        let mut stored = StoredFile {
            path,
            disk,
            filename: String::new(),
            formatted_filename: String::new(),
            extension,
            mime_type,
            size,
        };
        stored.rename(&stem);
        Ok(stored)
    }

    fn blob_path(&self, directory: Option<&str>, extension: &str, now: DateTime<Utc>) -> String {
        let mut segments: Vec<String> = Vec::with_capacity(5);
        for prefix in [Some(self.config.base_dir.as_str()), directory] {
            if let Some(prefix) = prefix.map(|p| p.trim_matches('/'))
                && !prefix.is_empty()
            {
                segments.push(prefix.to_owned());
            }
        }
        segments.push(now.format("%Y").to_string());
        segments.push(now.format("%m").to_string());

        let id = Uuid::new_v4();
        segments.push(if extension.is_empty() {
            id.to_string()
        } else {
            format!("{id}.{}", extension.to_ascii_lowercase())
        });
        segments.join("/")
    }

    /// Delete the blob behind `media`. `Ok(false)` when nothing was deleted.
    pub async fn delete(&self, media: &MediaItem) -> Result<bool, MediaError> {
        let deleted = self
            .blobs
            .delete(&media.disk, &media.path)
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))?;
        if !deleted {
            warn!(
                media_id = %media.id,
                disk = %media.disk,
                path = %media.path,
                "failed to delete media file"
            );
        }
        Ok(deleted)
    }

    /// Remove a stored file that never made it into a record.
    pub async fn discard(&self, stored: &StoredFile) -> Result<bool, MediaError> {
        self.blobs
            .delete(&stored.disk, &stored.path)
            .await
            .map_err(|e| MediaError::Storage(e.to_string()))
    }

    pub fn absolute_path(&self, media: &MediaItem) -> Result<String, MediaError> {
        self.blobs
            .absolute_path(&media.disk, &media.path)
            .map_err(|e| MediaError::Storage(e.to_string()))
    }
}

/// Trust the client's MIME type unless it is missing or generic, then guess
/// from the file name.
pub fn detect_mime(claimed: Option<&str>, original_name: &str) -> Option<String> {
    let claimed = claimed
        .map(str::trim)
        .filter(|mime| !mime.is_empty());
    match claimed {
        Some(mime) if mime != DEFAULT_MIME_TYPE => Some(mime.to_owned()),
        _ => mime_guess::from_path(original_name)
            .first_raw()
            .map(str::to_owned)
            .or_else(|| claimed.map(str::to_owned)),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mediagate_blob_memory::MemoryBlobStore;
    use mediagate_core::MediaId;

    use super::*;

    fn uploader() -> (Uploader, Arc<MemoryBlobStore>) {
        let blobs = Arc::new(MemoryBlobStore::new());
        (Uploader::new(blobs.clone(), UploadConfig::default()), blobs)
    }

    fn file(name: &str, content_type: Option<&str>) -> UploadedFile {
        UploadedFile {
            original_name: name.into(),
            content_type: content_type.map(str::to_owned),
            data: Bytes::from_static(b"%PDF-1.7"),
        }
    }

    fn october() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn stores_under_dated_path() {
        let (uploader, blobs) = uploader();
        let stored = uploader
            .upload_at(file("Annual Report.PDF", Some("application/pdf")), None, None, october())
            .await
            .unwrap();

        assert!(stored.path.starts_with("uploads/2026/10/"), "{}", stored.path);
        assert!(stored.path.ends_with(".pdf"));
        assert_eq!(stored.disk, "local");
        assert_eq!(stored.filename, "annual-report");
        assert_eq!(stored.extension, "PDF");
        assert_eq!(stored.formatted_filename, "annual-report.PDF");
        assert_eq!(stored.mime_type.as_deref(), Some("application/pdf"));
        assert_eq!(stored.size, 8);
        assert!(blobs.exists("local", &stored.path).await.unwrap());
    }

    #[tokio::test]
    async fn directory_is_inserted_after_base_dir() {
        let (uploader, _) = uploader();
        let stored = uploader
            .upload_at(file("a.png", None), Some("/avatars/"), None, october())
            .await
            .unwrap();
        assert!(stored.path.starts_with("uploads/avatars/2026/10/"), "{}", stored.path);
    }

    #[tokio::test]
    async fn paths_are_unique() {
        let (uploader, _) = uploader();
        let a = uploader.upload_at(file("a.pdf", None), None, None, october()).await.unwrap();
        let b = uploader.upload_at(file("a.pdf", None), None, None, october()).await.unwrap();
        assert_ne!(a.path, b.path);
    }

    #[tokio::test]
    async fn no_extension() {
        let (uploader, _) = uploader();
        let stored = uploader
            .upload_at(file("README", None), None, None, october())
            .await
            .unwrap();
        assert_eq!(stored.extension, "");
        assert_eq!(stored.formatted_filename, "readme");
        assert!(!stored.path.rsplit('/').next().unwrap().contains('.'));
    }

    #[test]
    fn mime_detection() {
        assert_eq!(detect_mime(Some("image/png"), "x.pdf").as_deref(), Some("image/png"));
        assert_eq!(
            detect_mime(Some("application/octet-stream"), "x.pdf").as_deref(),
            Some("application/pdf")
        );
        assert_eq!(detect_mime(None, "photo.jpg").as_deref(), Some("image/jpeg"));
        assert_eq!(
            detect_mime(Some("application/octet-stream"), "blob.unknownext").as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(detect_mime(None, "noext"), None);
    }

    #[tokio::test]
    async fn unknown_disk_fails() {
        let (uploader, _) = uploader();
        let err = uploader
            .upload_at(file("a.pdf", None), None, Some("s3"), october())
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::UploadFailed));
        assert_eq!(err.status(), 500);
    }

    #[tokio::test]
    async fn delete_reports_missing_blob() {
        let (uploader, _) = uploader();
        let stored = uploader.upload_at(file("a.pdf", None), None, None, october()).await.unwrap();
        let now = Utc::now();
        let media = MediaItem {
            id: MediaId::Int(1),
            path: stored.path.clone(),
            disk: stored.disk.clone(),
            filename: stored.filename.clone(),
            formatted_filename: stored.formatted_filename.clone(),
            extension: stored.extension.clone(),
            mime_type: stored.mime_type.clone(),
            size: stored.size,
            created_at: now,
            updated_at: now,
        };
        assert!(uploader.delete(&media).await.unwrap());
        assert!(!uploader.delete(&media).await.unwrap());
        assert_eq!(
            uploader.absolute_path(&media).unwrap(),
            format!("memory://local/{}", stored.path)
        );
    }

    #[test]
    fn rename_keeps_extension() {
        let mut stored = StoredFile {
            path: "p".into(),
            disk: "local".into(),
            filename: "old".into(),
            formatted_filename: "old.pdf".into(),
            extension: "pdf".into(),
            mime_type: None,
            size: 0,
        };
        stored.rename("Quarterly Numbers");
        assert_eq!(stored.filename, "quarterly-numbers");
        assert_eq!(stored.formatted_filename, "quarterly-numbers.pdf");
    }
}
