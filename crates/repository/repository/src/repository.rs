use async_trait::async_trait;

use mediagate_core::{MediaId, MediaItem, MediaItemUpdate, NewMediaItem};

use crate::error::RepositoryError;

/// Persistence for media metadata records.
///
/// Implementations assign ids and maintain `created_at` / `updated_at`.
#[async_trait]
pub trait MediaRepository: Send + Sync {
    /// Look up a record. Returns `None` when no record has this id.
    async fn find(&self, id: &MediaId) -> Result<Option<MediaItem>, RepositoryError>;

    /// Persist a new record and return it with its assigned id.
    async fn create(&self, item: NewMediaItem) -> Result<MediaItem, RepositoryError>;

    /// Apply a partial update. Returns `false` when the record does not exist.
    ///
    /// A successful update bumps `updated_at`.
    async fn update(&self, id: &MediaId, update: MediaItemUpdate)
    -> Result<bool, RepositoryError>;

    /// Remove a record. Returns `false` when the record does not exist.
    async fn delete(&self, id: &MediaId) -> Result<bool, RepositoryError>;
}
