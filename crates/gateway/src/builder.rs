use std::sync::Arc;

use mediagate_blob::BlobStore;
use mediagate_crypto::Signer;
use mediagate_repository::MediaRepository;

use crate::error::GatewayError;
use crate::file_server::{FileServer, FileServerConfig};
use crate::manager::MediaManager;
use crate::metrics::MediaMetrics;
use crate::uploader::{UploadConfig, Uploader};
use crate::url_generator::{UrlGenerator, UrlGeneratorConfig};
use crate::validator::CapabilityValidator;

/// Fluent builder for constructing a [`MediaManager`].
///
/// A repository, a blob store and a signer must be supplied. Everything else
/// defaults (60 minute expiry, `private, max-age=3600`, ETags on, `local`
/// disk under `uploads/`).
#[derive(Default)]
pub struct MediaManagerBuilder {
    repository: Option<Arc<dyn MediaRepository>>,
    blobs: Option<Arc<dyn BlobStore>>,
    signer: Option<Signer>,
    urls: UrlGeneratorConfig,
    files: FileServerConfig,
    upload: UploadConfig,
    metrics: Option<Arc<MediaMetrics>>,
}

impl MediaManagerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metadata repository.
    #[must_use]
    pub fn repository(mut self, repository: Arc<dyn MediaRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Set the blob store holding file contents.
    #[must_use]
    pub fn blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Set the signer shared by the URL generator and the validator.
    #[must_use]
    pub fn signer(mut self, signer: Signer) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Set the address capabilities are appended to.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.urls.base_url = base_url.into();
        self
    }

    /// Set the default expiry; `None` issues non-expiring capabilities.
    #[must_use]
    pub fn default_expiration_minutes(mut self, minutes: Option<i64>) -> Self {
        self.urls.default_expiration_minutes = minutes;
        self
    }

    #[must_use]
    pub fn file_server_config(mut self, config: FileServerConfig) -> Self {
        self.files = config;
        self
    }

    #[must_use]
    pub fn upload_config(mut self, config: UploadConfig) -> Self {
        self.upload = config;
        self
    }

    /// Share an existing metrics instance.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<MediaMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the [`MediaManager`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if a required component is
    /// missing or the default upload disk is not known to the blob store.
    pub fn build(self) -> Result<MediaManager, GatewayError> {
        let repository = self
            .repository
            .ok_or_else(|| GatewayError::Configuration("media repository is required".into()))?;

        let blobs = self
            .blobs
            .ok_or_else(|| GatewayError::Configuration("blob store is required".into()))?;

        let signer = self
            .signer
            .ok_or_else(|| GatewayError::Configuration("signer is required".into()))?;

        if !blobs.has_disk(&self.upload.default_disk) {
            return Err(GatewayError::Configuration(format!(
                "default disk `{}` is not configured",
                self.upload.default_disk
            )));
        }

        let metrics = self.metrics.unwrap_or_default();
        let files = FileServer::new(Arc::clone(&repository), Arc::clone(&blobs), self.files)
            .with_metrics(Arc::clone(&metrics));

        Ok(MediaManager {
            repository,
            uploader: Uploader::new(blobs, self.upload),
            urls: UrlGenerator::new(signer.clone(), self.urls),
            validator: CapabilityValidator::new(signer),
            files,
            metrics,
        })
    }
}
