use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::MediaId;

/// MIME type used when a record has none.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Metadata for a stored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    /// Location inside the disk (e.g. `uploads/2026/10/<uuid>.pdf`).
    pub path: String,
    /// Name of the blob-store disk holding the bytes.
    pub disk: String,
    /// Sanitized display name without extension.
    pub filename: String,
    /// Sanitized display name with extension.
    pub formatted_filename: String,
    /// Extension as uploaded, without the leading dot. May be empty.
    pub extension: String,
    pub mime_type: Option<String>,
    /// Size in bytes.
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaItem {
    /// Name presented to clients: `filename.extension`, or just `filename`
    /// when there is no extension.
    pub fn display_name(&self) -> String {
        join_name(&self.filename, &self.extension)
    }

    /// Stored MIME type, falling back to `application/octet-stream`.
    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
    }
}

/// Attributes for a record that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMediaItem {
    pub path: String,
    pub disk: String,
    pub filename: String,
    pub formatted_filename: String,
    pub extension: String,
    pub mime_type: Option<String>,
    pub size: u64,
}

/// Partial update applied to an existing record. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaItemUpdate {
    pub filename: Option<String>,
    pub formatted_filename: Option<String>,
}

impl MediaItemUpdate {
    /// Rename a record while keeping its extension.
    pub fn rename(filename: &str, extension: &str) -> Self {
        Self {
            filename: Some(filename.to_owned()),
            formatted_filename: Some(join_name(filename, extension)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.filename.is_none() && self.formatted_filename.is_none()
    }
}

fn join_name(filename: &str, extension: &str) -> String {
    if extension.is_empty() {
        filename.to_owned()
    } else {
        format!("{filename}.{extension}")
    }
}
