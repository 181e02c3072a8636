use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::debug;

use mediagate_core::{CapabilityPayload, GenerateOptions, MediaAction, MediaItem, encode_payload};
use mediagate_crypto::Signer;

/// Characters left untouched in a query value (RFC 3986 unreserved set).
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Static settings for [`UrlGenerator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlGeneratorConfig {
    /// Address of the secure serving endpoint, without a query string.
    pub base_url: String,
    /// Minutes until expiry when the caller does not choose; `None` issues
    /// non-expiring capabilities by default.
    pub default_expiration_minutes: Option<i64>,
}

impl Default for UrlGeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: "/api/media-items/secure".into(),
            default_expiration_minutes: Some(60),
        }
    }
}

/// A signed capability before transport framing.
///
/// `data` is exactly the string that was signed. Percent-encoding only
/// happens in [`query`](Self::query) and [`url`](Self::url).
#[derive(Debug, Clone, PartialEq)]
pub struct SignedCapability {
    pub payload: CapabilityPayload,
    pub data: String,
    pub signature: String,
}

impl SignedCapability {
    /// Unix timestamp after which the capability is rejected.
    pub fn expires_at(&self) -> Option<i64> {
        self.payload.expires_at
    }

    /// `data=..&signature=..` with both values percent-encoded.
    pub fn query(&self) -> String {
        format!(
            "data={}&signature={}",
            utf8_percent_encode(&self.data, QUERY_VALUE),
            utf8_percent_encode(&self.signature, QUERY_VALUE)
        )
    }

    /// Append the query to `base`, which may already carry a query string.
    pub fn url(&self, base: &str) -> String {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{base}{separator}{}", self.query())
    }
}

/// Builds signed capability URLs for media records.
///
/// Generation is pure given a clock value: the `*_at` methods take `now`
/// explicitly, the others read the system clock once per call.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    signer: Signer,
    config: UrlGeneratorConfig,
}

impl UrlGenerator {
    pub fn new(signer: Signer, config: UrlGeneratorConfig) -> Self {
        Self { signer, config }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn default_expiration_minutes(&self) -> Option<i64> {
        self.config.default_expiration_minutes
    }

    /// Build, encode and sign the payload for `media`.
    pub fn issue(
        &self,
        media: &MediaItem,
        action: MediaAction,
        options: &GenerateOptions,
        now: DateTime<Utc>,
    ) -> SignedCapability {
        let expires_at = options
            .expiration
            .resolve(self.config.default_expiration_minutes)
            .map(|minutes| now.timestamp().saturating_add(minutes.saturating_mul(60)));

        let payload = CapabilityPayload::new(media.id.clone(), action, expires_at)
            .with_metadata(options.metadata.clone());
        let data = encode_payload(&payload);
        let signature = self.signer.sign(&data);

        debug!(media_id = %media.id, %action, ?expires_at, "capability issued");
        SignedCapability {
            payload,
            data,
            signature,
        }
    }

    /// Capability URL for `media` using the current time.
    pub fn generate(
        &self,
        media: &MediaItem,
        action: MediaAction,
        options: &GenerateOptions,
    ) -> String {
        self.generate_at(media, action, options, Utc::now())
    }

    pub fn generate_at(
        &self,
        media: &MediaItem,
        action: MediaAction,
        options: &GenerateOptions,
        now: DateTime<Utc>,
    ) -> String {
        self.issue(media, action, options, now)
            .url(&self.config.base_url)
    }

    /// One URL per record, in input order, all sharing a single `now`.
    pub fn generate_batch(
        &self,
        items: &[MediaItem],
        action: MediaAction,
        options: &GenerateOptions,
    ) -> Vec<String> {
        let now = Utc::now();
        items
            .iter()
            .map(|media| self.generate_at(media, action, options, now))
            .collect()
    }
}
