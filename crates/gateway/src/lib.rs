pub mod builder;
pub mod error;
pub mod file_server;
pub mod manager;
pub mod metrics;
pub mod uploader;
pub mod url_generator;
pub mod validator;

pub use builder::MediaManagerBuilder;
pub use error::GatewayError;
pub use file_server::{
    FileServer, FileServerConfig, MediaHeaders, MediaStream, ServeStatus, ServedMedia,
    compute_etag,
};
pub use manager::MediaManager;
pub use metrics::{MediaMetrics, MetricsSnapshot};
pub use uploader::{StoredFile, UploadConfig, UploadedFile, Uploader};
pub use url_generator::{SignedCapability, UrlGenerator, UrlGeneratorConfig};
pub use validator::{CapabilityValidator, SignatureQuery};
