use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use mediagate_core::{MediaId, MediaItem};
use mediagate_gateway::{MetricsSnapshot, SignedCapability};

/// Outcome marker carried by every JSON envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Success,
    Error,
}

/// Field name to validation messages. Serializes as `[]` when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList(pub BTreeMap<String, Vec<String>>);

impl ErrorList {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_owned()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ErrorList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_empty() {
            serializer.collect_seq(std::iter::empty::<()>())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for ErrorList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Map(BTreeMap<String, Vec<String>>),
            Empty(Vec<Value>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Map(map) => Self(map),
            Repr::Empty(_) => Self::default(),
        })
    }
}

/// JSON envelope used by every non-file response.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse {
    pub result: ResultKind,
    #[schema(example = "File uploaded successfully.")]
    pub message: Option<String>,
    /// Endpoint-specific payload, or `null`.
    #[schema(value_type = Object)]
    pub model: Value,
    /// Field name to messages on validation failures, `[]` otherwise.
    #[schema(value_type = Object)]
    pub error_list: ErrorList,
    /// HTTP status code, repeated in the body.
    #[schema(example = 200)]
    pub code: u16,
}

impl ApiResponse {
    pub fn success(code: u16, message: Option<&str>, model: Value) -> Self {
        Self {
            result: ResultKind::Success,
            message: message.map(str::to_owned),
            model,
            error_list: ErrorList::default(),
            code,
        }
    }

    pub fn error(code: u16, message: impl Into<String>, error_list: ErrorList) -> Self {
        Self {
            result: ResultKind::Error,
            message: Some(message.into()),
            model: Value::Null,
            error_list,
            code,
        }
    }
}

/// Public view of a media record, with a VIEW link using the default expiry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MediaItemResource {
    #[schema(value_type = Object, example = 42)]
    pub id: MediaId,
    #[schema(example = "annual-report")]
    pub filename: String,
    #[schema(example = "annual-report.pdf")]
    pub formatted_filename: String,
    #[schema(example = "pdf")]
    pub extension: String,
    #[schema(example = "application/pdf")]
    pub mime_type: Option<String>,
    /// Size in bytes.
    pub size: u64,
    /// Signed VIEW link.
    pub url: String,
    /// Unix timestamp at which `url` stops working, `null` if never.
    pub expires_at: Option<i64>,
}

impl MediaItemResource {
    pub fn new(media: &MediaItem, link: &SignedCapability, base_url: &str) -> Self {
        Self {
            id: media.id.clone(),
            filename: media.filename.clone(),
            formatted_filename: media.formatted_filename.clone(),
            extension: media.extension.clone(),
            mime_type: media.mime_type.clone(),
            size: media.size,
            url: link.url(base_url),
            expires_at: link.expires_at(),
        }
    }
}

/// Multipart form accepted by the upload endpoint.
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Display name replacing the client's file name (max 255 characters).
    pub custom_filename: Option<String>,
}

/// Body of `PUT /{prefix}/{id}/update-filename`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateFilenameRequest {
    #[serde(default)]
    #[schema(example = "Quarterly numbers")]
    pub new_file_name: Option<String>,
}

/// Body of `POST /{prefix}/{id}/url`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UrlRequest {
    /// `view` (default) or `download`.
    #[serde(default)]
    #[schema(example = "download")]
    pub action: Option<String>,
    /// Minutes until expiry. Omit for the configured default, `null` for
    /// a link that never expires.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<i64>, example = 15)]
    pub expiration_minutes: Option<Option<i64>>,
    /// Extra fields carried in the signed payload.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Option<Map<String, Value>>,
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Model returned by the URL endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UrlResponse {
    pub url: String,
    pub expires_at: Option<i64>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    pub metrics: MetricsResponse,
}

/// Gateway counters since startup.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MetricsResponse {
    /// Signed links issued.
    #[schema(example = 120)]
    pub issued: u64,
    /// Files streamed with 200.
    #[schema(example = 97)]
    pub served: u64,
    /// Conditional requests answered with 304.
    #[schema(example = 14)]
    pub not_modified: u64,
    /// Requests refused for a missing, forged, malformed or expired link.
    #[schema(example = 3)]
    pub rejected: u64,
    /// Records whose blob was gone.
    pub missing_on_disk: u64,
    /// Blob reads that failed while opening or streaming.
    pub stream_errors: u64,
    pub uploads: u64,
    pub deletes: u64,
}

impl From<MetricsSnapshot> for MetricsResponse {
    fn from(snap: MetricsSnapshot) -> Self {
        Self {
            issued: snap.issued,
            served: snap.served,
            not_modified: snap.not_modified,
            rejected: snap.rejected,
            missing_on_disk: snap.missing_on_disk,
            stream_errors: snap.stream_errors,
            uploads: snap.uploads,
            deletes: snap.deletes,
        }
    }
}
