use serde::Deserialize;

/// Mount point of the media routes.
///
/// With the defaults the serving endpoint is `/api/media-items/secure` and
/// the management endpoints live under `/api/media-items`.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Segment of the serving endpoint below `prefix`.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            path: default_path(),
        }
    }
}

impl RouteConfig {
    /// `/{prefix}`
    pub fn collection_path(&self) -> String {
        join(&[&self.prefix])
    }

    /// `/{prefix}/{path}`
    pub fn secure_path(&self) -> String {
        join(&[&self.prefix, &self.path])
    }

    /// `/{prefix}/{segments...}`, e.g. `item_path(&["{id}", "url"])`.
    pub fn item_path(&self, segments: &[&str]) -> String {
        let mut all = Vec::with_capacity(segments.len() + 1);
        all.push(self.prefix.as_str());
        all.extend_from_slice(segments);
        join(&all)
    }
}

fn join(segments: &[&str]) -> String {
    let mut path = String::new();
    for segment in segments.iter().map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

fn default_prefix() -> String {
    "api/media-items".to_owned()
}

fn default_path() -> String {
    "secure".to_owned()
}
