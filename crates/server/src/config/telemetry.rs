use std::collections::HashMap;

use serde::Deserialize;

/// OpenTelemetry export settings.
///
/// Spans for HTTP requests, capability validation, uploads and file serving
/// are exported via OTLP when `enabled` is set.
///
/// ```toml
/// [telemetry]
/// enabled = true
/// endpoint = "http://localhost:4317"
/// protocol = "grpc"
/// sample_ratio = 0.25
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,
    /// OTLP collector endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Fraction of traces kept, clamped to `0.0..=1.0`.
    #[serde(default = "default_sample_ratio")]
    pub sample_ratio: f64,
    #[serde(default)]
    pub protocol: OtlpProtocol,
    /// Exporter timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Extra resource attributes attached to every span.
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
}

/// OTLP transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

impl std::fmt::Display for OtlpProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Grpc => "grpc",
            Self::Http => "http",
        })
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            service_name: default_service_name(),
            sample_ratio: default_sample_ratio(),
            protocol: OtlpProtocol::default(),
            timeout_seconds: default_timeout(),
            resource_attributes: HashMap::new(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:4317".to_owned()
}

fn default_service_name() -> String {
    "mediagate".to_owned()
}

fn default_sample_ratio() -> f64 {
    1.0
}

fn default_timeout() -> u64 {
    10
}
