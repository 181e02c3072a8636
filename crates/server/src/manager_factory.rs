use std::sync::Arc;

use tracing::info;

use mediagate_blob::BlobStore;
use mediagate_blob_local::LocalBlobStore;
use mediagate_blob_memory::MemoryBlobStore;
use mediagate_crypto::Signer;
use mediagate_gateway::{FileServerConfig, MediaManager, MediaManagerBuilder};
use mediagate_repository_memory::MemoryMediaRepository;

use crate::config::{HmacConfig, MediaGateConfig, StorageConfig};
use crate::error::ServerError;

/// Create the blob store selected by `[storage].backend`.
pub fn create_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, ServerError> {
    match config.backend.as_str() {
        "local" => {
            if config.disks.is_empty() {
                return Err(ServerError::Config(
                    "local storage needs at least one entry in [storage.disks]".into(),
                ));
            }
            let store = config
                .disks
                .iter()
                .fold(LocalBlobStore::new(), |store, (name, root)| {
                    info!(disk = %name, root = %root.display(), "registering local disk");
                    store.with_disk(name.clone(), root.clone())
                });
            Ok(Arc::new(store))
        }
        "memory" => {
            let mut disks: Vec<&str> = config.disks.keys().map(String::as_str).collect();
            if disks.is_empty() {
                disks.push(&config.default_disk);
            }
            Ok(Arc::new(MemoryBlobStore::with_disks(disks)))
        }
        other => Err(ServerError::Config(format!(
            "unknown storage backend: {other}"
        ))),
    }
}

/// Build the signer from `[hmac]`, reading the secret from the environment
/// when the file does not set one.
pub fn create_signer(config: &HmacConfig) -> Result<Signer, ServerError> {
    let secret = config.resolve_secret()?;
    Ok(Signer::from_config(&secret, &config.algorithm)?)
}

/// Assemble the [`MediaManager`] from the full configuration.
pub fn create_manager(config: &MediaGateConfig) -> Result<MediaManager, ServerError> {
    create_manager_with_signer(config, create_signer(&config.hmac)?)
}

/// Like [`create_manager`] with an already-built signer.
pub fn create_manager_with_signer(
    config: &MediaGateConfig,
    signer: Signer,
) -> Result<MediaManager, ServerError> {
    let blobs = create_blob_store(&config.storage)?;
    let base_url = format!(
        "{}{}",
        config.server.public_origin(),
        config.route.secure_path()
    );

    let manager = MediaManagerBuilder::new()
        .repository(Arc::new(MemoryMediaRepository::new()))
        .blobs(blobs)
        .signer(signer)
        .base_url(base_url)
        .default_expiration_minutes(config.hmac.default_expiration_minutes.minutes()?)
        .file_server_config(FileServerConfig {
            cache_control: config.performance.cache_control_header(),
            enable_etag: config.performance.enable_etag,
        })
        .upload_config(mediagate_gateway::UploadConfig {
            default_disk: config.storage.default_disk.clone(),
            base_dir: config.storage.base_dir.clone(),
        })
        .build()?;

    info!(
        backend = %config.storage.backend,
        default_disk = %config.storage.default_disk,
        base_url = %manager.url_generator().base_url(),
        "media manager ready"
    );
    Ok(manager)
}

#[cfg(test)]
mod tests {
    use mediagate_crypto::{HmacAlgorithm, SecretString};

    use super::*;

    fn signer() -> Signer {
        Signer::new(&SecretString::new("factory-secret".into()), HmacAlgorithm::Sha256).unwrap()
    }

    fn config(toml: &str) -> MediaGateConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn memory_backend() {
        let config = config(
            r#"
            [server]
            external_url = "https://media.example.com"

            [storage]
            backend = "memory"
            "#,
        );
        let manager = create_manager_with_signer(&config, signer()).unwrap();
        assert_eq!(
            manager.url_generator().base_url(),
            "https://media.example.com/api/media-items/secure"
        );
        assert_eq!(manager.url_generator().default_expiration_minutes(), Some(60));
    }

    #[test]
    fn local_backend_uses_configured_roots() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(r#"hmac = { default_expiration_minutes = "never" }"#);
        config
            .storage
            .disks
            .insert("local".into(), dir.path().to_path_buf());

        let manager = create_manager_with_signer(&config, signer()).unwrap();
        assert_eq!(manager.url_generator().default_expiration_minutes(), None);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let config = config(r#"storage = { backend = "s3" }"#);
        let err = create_manager_with_signer(&config, signer()).unwrap_err();
        assert!(err.to_string().contains("unknown storage backend: s3"));
    }

    #[test]
    fn default_disk_must_exist() {
        let config = config(
            r#"
            [storage]
            backend = "memory"
            default_disk = "archive"
            "#,
        );
        let err = create_manager_with_signer(&config, signer()).unwrap_err();
        assert!(matches!(err, ServerError::Gateway(_)), "{err}");
    }

    #[test]
    fn signer_validates_algorithm() {
        let config: HmacConfig = toml::from_str(
            r#"
            secret = "abc"
            algorithm = "md5"
            "#,
        )
        .unwrap();
        let err = create_signer(&config).unwrap_err();
        assert!(matches!(err, ServerError::Signer(_)), "{err}");
    }

    #[test]
    fn signer_rejects_empty_secret() {
        let config: HmacConfig = toml::from_str(r#"secret = """#).unwrap();
        let err = create_signer(&config).unwrap_err();
        assert!(matches!(err, ServerError::Signer(_)), "{err}");
    }
}
