use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use mediagate_core::{
    CapabilityPayload, Expiration, GenerateOptions, MediaAction, MediaError, MediaId, MediaItem,
    MediaItemUpdate, NewMediaItem, sanitize_filename,
};
use mediagate_repository::{MediaRepository, RepositoryError};

use crate::file_server::{FileServer, ServedMedia};
use crate::metrics::MediaMetrics;
use crate::uploader::{StoredFile, UploadedFile, Uploader};
use crate::url_generator::{SignedCapability, UrlGenerator};
use crate::validator::{CapabilityValidator, SignatureQuery};

/// Application service tying storage, metadata and capabilities together.
///
/// Construct with [`MediaManagerBuilder`](crate::MediaManagerBuilder).
pub struct MediaManager {
    pub(crate) repository: Arc<dyn MediaRepository>,
    pub(crate) uploader: Uploader,
    pub(crate) urls: UrlGenerator,
    pub(crate) validator: CapabilityValidator,
    pub(crate) files: FileServer,
    pub(crate) metrics: Arc<MediaMetrics>,
}

impl std::fmt::Debug for MediaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaManager")
            .field("uploader", &self.uploader)
            .field("urls", &self.urls)
            .field("files", &self.files)
            .finish_non_exhaustive()
    }
}

fn storage(e: RepositoryError) -> MediaError {
    MediaError::Storage(e.to_string())
}

impl MediaManager {
    pub fn metrics(&self) -> &Arc<MediaMetrics> {
        &self.metrics
    }

    pub fn url_generator(&self) -> &UrlGenerator {
        &self.urls
    }

    // =========================================================================
    // Storage
    // =========================================================================

    /// Write a file to the blob store without creating a record.
    pub async fn upload_file(
        &self,
        file: UploadedFile,
        directory: Option<&str>,
        disk: Option<&str>,
    ) -> Result<StoredFile, MediaError> {
        self.uploader.upload(file, directory, disk).await
    }

    /// Delete the blob behind `media`. A blob that was already gone is a
    /// [`MediaError::DeleteFailed`].
    pub async fn delete_file(&self, media: &MediaItem) -> Result<(), MediaError> {
        if self.uploader.delete(media).await? {
            Ok(())
        } else {
            Err(MediaError::DeleteFailed)
        }
    }

    pub fn absolute_path(&self, media: &MediaItem) -> Result<String, MediaError> {
        self.uploader.absolute_path(media)
    }

    // =========================================================================
    // Records
    // =========================================================================

    pub async fn create_media_item(&self, item: NewMediaItem) -> Result<MediaItem, MediaError> {
        self.repository.create(item).await.map_err(storage)
    }

    pub async fn update_media_item(
        &self,
        id: &MediaId,
        update: MediaItemUpdate,
    ) -> Result<bool, MediaError> {
        self.repository.update(id, update).await.map_err(storage)
    }

    /// Delete the record for `id`. A missing record is a
    /// [`MediaError::DeleteFailed`].
    pub async fn delete_media_item(&self, id: &MediaId) -> Result<(), MediaError> {
        if self.repository.delete(id).await.map_err(storage)? {
            Ok(())
        } else {
            Err(MediaError::DeleteFailed)
        }
    }

    pub async fn find_media_item_or_fail(&self, id: &MediaId) -> Result<MediaItem, MediaError> {
        self.repository
            .find(id)
            .await
            .map_err(storage)?
            .ok_or_else(|| MediaError::MediaNotFound { id: id.clone() })
    }

    /// Upload a file and persist its record.
    ///
    /// `custom_filename`, when non-blank, replaces the client's file name. If
    /// the record cannot be created the blob is removed again.
    #[instrument(name = "manager.upload_and_create", skip_all)]
    pub async fn upload_and_create(
        &self,
        file: UploadedFile,
        custom_filename: Option<&str>,
        directory: Option<&str>,
    ) -> Result<MediaItem, MediaError> {
        let mut stored = self.uploader.upload(file, directory, None).await?;
        if let Some(name) = custom_filename.map(str::trim).filter(|n| !n.is_empty()) {
            stored.rename(name);
        }

        match self.repository.create(NewMediaItem::from(stored.clone())).await {
            Ok(media) => {
                self.metrics.increment_uploads();
                info!(media_id = %media.id, "media item created");
                Ok(media)
            }
            Err(e) => {
                warn!(disk = %stored.disk, path = %stored.path, error = %e, "record creation failed, removing upload");
                if let Err(cleanup) = self.uploader.discard(&stored).await {
                    warn!(error = %cleanup, "orphaned upload could not be removed");
                }
                Err(MediaError::UploadFailed)
            }
        }
    }

    /// Rename a record, keeping its extension, and return the refreshed record.
    pub async fn update_filename(
        &self,
        id: &MediaId,
        new_name: &str,
    ) -> Result<MediaItem, MediaError> {
        let media = self.find_media_item_or_fail(id).await?;
        let safe = sanitize_filename(new_name);
        let update = MediaItemUpdate::rename(&safe, &media.extension);
        if !self.update_media_item(id, update).await? {
            return Err(MediaError::MediaNotFound { id: id.clone() });
        }
        self.find_media_item_or_fail(id).await
    }

    /// Delete the blob and then the record for `id`.
    #[instrument(name = "manager.delete", skip(self), fields(media_id = %id))]
    pub async fn delete(&self, id: &MediaId) -> Result<(), MediaError> {
        let media = self.find_media_item_or_fail(id).await?;
        self.delete_file(&media).await?;
        self.delete_media_item(id).await?;
        self.metrics.increment_deletes();
        info!("media item deleted");
        Ok(())
    }

    // =========================================================================
    // Capabilities
    // =========================================================================

    pub fn issue(
        &self,
        media: &MediaItem,
        action: MediaAction,
        options: &GenerateOptions,
    ) -> SignedCapability {
        self.metrics.increment_issued();
        self.urls.issue(media, action, options, Utc::now())
    }

    pub fn generate_url(
        &self,
        media: &MediaItem,
        action: MediaAction,
        options: &GenerateOptions,
    ) -> String {
        self.metrics.increment_issued();
        self.urls.generate(media, action, options)
    }

    pub fn generate_view_url(&self, media: &MediaItem, options: &GenerateOptions) -> String {
        self.generate_url(media, MediaAction::View, options)
    }

    pub fn generate_download_url(&self, media: &MediaItem, options: &GenerateOptions) -> String {
        self.generate_url(media, MediaAction::Download, options)
    }

    /// URL expiring `minutes` from now regardless of the configured default.
    pub fn generate_temporary_url(
        &self,
        media: &MediaItem,
        minutes: i64,
        action: MediaAction,
        options: &GenerateOptions,
    ) -> String {
        let options = GenerateOptions {
            expiration: Expiration::Minutes(minutes),
            metadata: options.metadata.clone(),
        };
        self.generate_url(media, action, &options)
    }

    /// One URL per record, in input order.
    pub fn generate_urls(
        &self,
        items: &[MediaItem],
        action: MediaAction,
        options: &GenerateOptions,
    ) -> Vec<String> {
        self.metrics.add_issued(items.len() as u64);
        self.urls.generate_batch(items, action, options)
    }

    pub fn validate(&self, query: &SignatureQuery) -> Result<CapabilityPayload, MediaError> {
        self.validate_at(query, Utc::now().timestamp())
    }

    fn validate_at(&self, query: &SignatureQuery, now: i64) -> Result<CapabilityPayload, MediaError> {
        self.validator.validate_at(query, now).inspect_err(|e| {
            self.metrics.increment_rejected();
            info!(reason = e.message_key(), "capability rejected");
        })
    }

    pub async fn serve(
        &self,
        payload: &CapabilityPayload,
        if_none_match: Option<&str>,
    ) -> Result<ServedMedia, MediaError> {
        self.files.serve(payload, if_none_match).await
    }

    /// Validate and serve with a single clock reading.
    #[instrument(name = "manager.validate_and_serve", skip_all)]
    pub async fn validate_and_serve(
        &self,
        query: &SignatureQuery,
        if_none_match: Option<&str>,
    ) -> Result<ServedMedia, MediaError> {
        let now = Utc::now().timestamp();
        let payload = self.validate_at(query, now)?;
        self.files.serve_at(&payload, if_none_match, now).await
    }
}
