use thiserror::Error;

use crate::types::MediaId;

/// Closed set of domain failures surfaced by issuing, validating and serving
/// capabilities.
///
/// Each variant maps to an HTTP-equivalent status and a stable message key.
/// The `Display` text is the default English message and never contains
/// internal paths or payload contents.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Missing data or signature.")]
    MissingSignatureData,

    #[error("Invalid signature.")]
    InvalidSignature,

    #[error("Invalid payload data.")]
    InvalidPayload,

    #[error("Invalid action.")]
    InvalidAction,

    #[error("The link has expired.")]
    ExpiredLink,

    #[error("Media item not found.")]
    MediaNotFound {
        /// Requested id, kept for logging only.
        id: MediaId,
    },

    #[error("File is missing on disk.")]
    FileMissingOnDisk,

    #[error("Unable to upload file.")]
    UploadFailed,

    #[error("Unable to delete file.")]
    DeleteFailed,

    /// The blob store failed after the response headers were decided.
    #[error("Unable to stream file.")]
    StreamFailed,

    /// A storage backend failed outside of streaming. The detail is for logs.
    #[error("Storage error.")]
    Storage(String),
}

impl MediaError {
    /// HTTP-equivalent status code.
    pub fn status(&self) -> u16 {
        match self {
            Self::MissingSignatureData | Self::InvalidPayload | Self::InvalidAction => 400,
            Self::InvalidSignature | Self::ExpiredLink => 403,
            Self::MediaNotFound { .. } | Self::FileMissingOnDisk => 404,
            Self::DeleteFailed => 409,
            Self::UploadFailed | Self::StreamFailed | Self::Storage(_) => 500,
        }
    }

    /// Stable key identifying the human-readable message.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::MissingSignatureData => "missing_signature_data",
            Self::InvalidSignature => "invalid_signature",
            Self::InvalidPayload => "invalid_payload",
            Self::InvalidAction => "invalid_action",
            Self::ExpiredLink => "link_expired",
            Self::MediaNotFound { .. } => "media_not_found",
            Self::FileMissingOnDisk => "file_missing_on_disk",
            Self::UploadFailed => "upload_failed",
            Self::DeleteFailed => "delete_failed",
            Self::StreamFailed => "stream_failed",
            Self::Storage(_) => "storage_error",
        }
    }

    /// Whether the failure comes from the bearer's capability rather than
    /// from the server or its storage.
    pub fn is_capability_rejection(&self) -> bool {
        matches!(
            self,
            Self::MissingSignatureData
                | Self::InvalidSignature
                | Self::InvalidPayload
                | Self::InvalidAction
                | Self::ExpiredLink
        )
    }
}
