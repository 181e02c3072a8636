use thiserror::Error;

/// Errors raised while wiring a [`MediaManager`](crate::MediaManager).
///
/// Per-request failures use [`mediagate_core::MediaError`] instead.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The manager was misconfigured (e.g. missing required components).
    #[error("configuration error: {0}")]
    Configuration(String),
}
