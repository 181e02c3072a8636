use serde::Deserialize;

/// Response caching behaviour for served files.
#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceConfig {
    /// `Cache-Control` value for served files. An empty string omits the header.
    #[serde(default = "default_cache_control")]
    pub cache_control: String,
    /// Emit `ETag` and honour `If-None-Match`.
    #[serde(default = "default_enable_etag")]
    pub enable_etag: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            cache_control: default_cache_control(),
            enable_etag: default_enable_etag(),
        }
    }
}

impl PerformanceConfig {
    pub fn cache_control_header(&self) -> Option<String> {
        let value = self.cache_control.trim();
        (!value.is_empty()).then(|| value.to_owned())
    }
}

fn default_cache_control() -> String {
    "private, max-age=3600".to_owned()
}

fn default_enable_etag() -> bool {
    true
}
