use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The disk name is not configured on this store.
    #[error("unknown disk: {0}")]
    UnknownDisk(String),

    /// The path is empty, absolute, or escapes the disk root.
    #[error("invalid blob path: {0}")]
    InvalidPath(String),

    /// A storage backend error occurred.
    #[error("blob storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for BlobError {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}
