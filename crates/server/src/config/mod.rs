mod hmac;
mod performance;
mod route;
mod server;
mod storage;
mod telemetry;
mod upload;


pub use hmac::*;
pub use performance::*;
pub use route::*;
pub use server::*;
pub use storage::*;
pub use telemetry::*;
pub use upload::*;

use serde::Deserialize;

/// Top-level configuration for the mediagate server, loaded from a TOML file.
///
/// Every section is optional; a missing section takes its defaults. The only
/// value without a usable default is the HMAC secret.
#[derive(Debug, Default, Deserialize)]
pub struct MediaGateConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Capability signing configuration.
    #[serde(default)]
    pub hmac: HmacConfig,
    /// Response caching behaviour.
    #[serde(default)]
    pub performance: PerformanceConfig,
    /// Blob storage backend and disks.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Where the routes are mounted.
    #[serde(default)]
    pub route: RouteConfig,
    /// Upload validation rules.
    #[serde(default)]
    pub upload: UploadConfig,
    /// OpenTelemetry distributed tracing configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
