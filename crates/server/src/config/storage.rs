use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

/// Blob storage configuration.
///
/// # Example
///
/// ```toml
/// [storage]
/// backend = "local"
/// default_disk = "local"
/// base_dir = "uploads"
///
/// [storage.disks]
/// local = "storage/app"
/// archive = "/mnt/archive"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend type: `"local"` (filesystem) or `"memory"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Disk new uploads are written to.
    #[serde(default = "default_disk")]
    pub default_disk: String,
    /// Directory prefix inside the disk for every upload.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,
    /// Disk name to root directory. The memory backend only uses the names.
    #[serde(default = "default_disks")]
    pub disks: BTreeMap<String, PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            default_disk: default_disk(),
            base_dir: default_base_dir(),
            disks: default_disks(),
        }
    }
}

fn default_backend() -> String {
    "local".to_owned()
}

fn default_disk() -> String {
    "local".to_owned()
}

fn default_base_dir() -> String {
    "uploads".to_owned()
}

fn default_disks() -> BTreeMap<String, PathBuf> {
    BTreeMap::from([("local".to_owned(), PathBuf::from("storage/app"))])
}
