use thiserror::Error;

/// Errors that can occur in a media metadata repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backend could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// A record could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}
