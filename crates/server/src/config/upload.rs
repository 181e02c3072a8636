use serde::Deserialize;

/// Validation applied to uploads received over HTTP.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted file, in kilobytes.
    #[serde(default = "default_max_kb")]
    pub max_kb: u64,
    /// Accepted MIME types. Empty accepts any type.
    #[serde(default = "default_mimetypes")]
    pub mimetypes: Vec<String>,
    /// Accepted file extensions. Empty accepts any extension.
    #[serde(default)]
    pub mimes: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_kb: default_max_kb(),
            mimetypes: default_mimetypes(),
            mimes: Vec::new(),
        }
    }
}

impl UploadConfig {
    pub fn max_bytes(&self) -> u64 {
        self.max_kb.saturating_mul(1024)
    }
}

fn default_max_kb() -> u64 {
    51_200
}

fn default_mimetypes() -> Vec<String> {
    ["image/jpeg", "image/png", "application/pdf"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}
