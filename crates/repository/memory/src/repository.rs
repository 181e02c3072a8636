use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use mediagate_core::{MediaId, MediaItem, MediaItemUpdate, NewMediaItem};
use mediagate_repository::{MediaRepository, RepositoryError};

/// In-memory [`MediaRepository`] backed by a [`DashMap`].
///
/// Ids are assigned from a monotonically increasing counter starting at 1.
#[derive(Debug)]
pub struct MemoryMediaRepository {
    items: DashMap<MediaId, MediaItem>,
    next_id: AtomicI64,
}

impl MemoryMediaRepository {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Insert a fully-formed record, keeping its id and timestamps.
    ///
    /// Integer ids at or above the counter advance it so later `create`
    /// calls never collide with seeded records.
    pub fn insert(&self, item: MediaItem) {
        if let MediaId::Int(id) = item.id {
            self.next_id.fetch_max(id.saturating_add(1), Ordering::Relaxed);
        }
        self.items.insert(item.id.clone(), item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for MemoryMediaRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaRepository for MemoryMediaRepository {
    async fn find(&self, id: &MediaId) -> Result<Option<MediaItem>, RepositoryError> {
        Ok(self.items.get(id).map(|entry| entry.value().clone()))
    }

    async fn create(&self, item: NewMediaItem) -> Result<MediaItem, RepositoryError> {
        let id = MediaId::Int(self.next_id.fetch_add(1, Ordering::Relaxed));
        let now = Utc::now();
        let record = MediaItem {
            id: id.clone(),
            path: item.path,
            disk: item.disk,
            filename: item.filename,
            formatted_filename: item.formatted_filename,
            extension: item.extension,
            mime_type: item.mime_type,
            size: item.size,
            created_at: now,
            updated_at: now,
        };
        self.items.insert(id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        id: &MediaId,
        update: MediaItemUpdate,
    ) -> Result<bool, RepositoryError> {
        let Some(mut entry) = self.items.get_mut(id) else {
            return Ok(false);
        };
        let record = entry.value_mut();
        if let Some(filename) = update.filename {
            record.filename = filename;
        }
        if let Some(formatted) = update.formatted_filename {
            record.formatted_filename = formatted;
        }
        record.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete(&self, id: &MediaId) -> Result<bool, RepositoryError> {
        Ok(self.items.remove(id).is_some())
    }
}
