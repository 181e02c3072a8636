use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::MediaAction;
use crate::error::MediaError;
use crate::types::MediaId;

/// Untrusted key/value mapping recovered from an encoded payload.
///
/// The codec only guarantees that the input was a JSON object; field
/// presence and types are checked by [`CapabilityPayload::from_fields`].
pub type PayloadFields = Map<String, Value>;

/// The signed unit carried by a capability.
///
/// Field order in the serialized form is `id`, `action`, `expires_at`,
/// `metadata`, and `expires_at` is written as `null` when the capability
/// never expires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityPayload {
    /// Media record the capability refers to.
    pub id: MediaId,
    /// Permitted action.
    pub action: MediaAction,
    /// Unix timestamp (seconds) after which the capability is rejected.
    pub expires_at: Option<i64>,
    /// Caller-supplied data. Signed, not encrypted: the bearer can read it.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl CapabilityPayload {
    /// Build a payload from its parts.
    pub fn new(id: MediaId, action: MediaAction, expires_at: Option<i64>) -> Self {
        Self {
            id,
            action,
            expires_at,
            metadata: Map::new(),
        }
    }

    /// Attach caller metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Convert a decoded mapping into a typed payload.
    ///
    /// Fails with [`MediaError::InvalidAction`] when `action` is missing or
    /// unknown, and with [`MediaError::InvalidPayload`] when any other field
    /// has the wrong shape.
    pub fn from_fields(fields: &PayloadFields) -> Result<Self, MediaError> {
        let id = fields
            .get("id")
            .and_then(MediaId::from_json)
            .ok_or(MediaError::InvalidPayload)?;

        let action = fields
            .get("action")
            .and_then(Value::as_str)
            .and_then(|raw| raw.parse::<MediaAction>().ok())
            .ok_or(MediaError::InvalidAction)?;

        let expires_at = match fields.get("expires_at") {
            None | Some(Value::Null) => None,
            Some(Value::Number(n)) => Some(n.as_i64().ok_or(MediaError::InvalidPayload)?),
            Some(_) => return Err(MediaError::InvalidPayload),
        };

        let metadata = match fields.get("metadata") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(MediaError::InvalidPayload),
        };

        Ok(Self {
            id,
            action,
            expires_at,
            metadata,
        })
    }

    /// Whether the capability is expired at `now` (unix seconds).
    ///
    /// The boundary is closed: a payload with `expires_at == now` is still valid.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }

    /// Seconds of validity left at `now`, clamped at zero. `None` when the
    /// capability never expires.
    pub fn remaining_seconds(&self, now: i64) -> Option<u64> {
        self.expires_at
            .map(|expires_at| u64::try_from(expires_at.saturating_sub(now)).unwrap_or(0))
    }
}

/// Expiration policy requested when issuing a capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Expiration {
    /// Use the configured default (which may itself be "never").
    #[default]
    Default,
    /// Issue a capability that never expires.
    Never,
    /// Expire the given number of minutes after issuance.
    Minutes(i64),
}

impl Expiration {
    /// Resolve against the configured default, yielding minutes or `None`
    /// for a non-expiring capability.
    pub fn resolve(self, default_minutes: Option<i64>) -> Option<i64> {
        match self {
            Self::Default => default_minutes,
            Self::Never => None,
            Self::Minutes(minutes) => Some(minutes),
        }
    }
}

impl From<Option<i64>> for Expiration {
    /// `Some(minutes)` expires after that many minutes; `None` never expires.
    fn from(minutes: Option<i64>) -> Self {
        minutes.map_or(Self::Never, Self::Minutes)
    }
}

/// Options accepted by the URL generator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    pub expiration: Expiration,
    pub metadata: Map<String, Value>,
}

impl GenerateOptions {
    /// Options that override the expiration and keep empty metadata.
    pub fn expiring(expiration: Expiration) -> Self {
        Self {
            expiration,
            metadata: Map::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> PayloadFields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn serializes_in_wire_order_with_null_expiry() {
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::Download, None);
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(
            json,
            r#"{"id":42,"action":"download","expires_at":null,"metadata":{}}"#
        );
    }

    #[test]
    fn from_fields_accepts_full_payload() {
        let payload = CapabilityPayload::from_fields(&fields(json!({
            "id": "abc",
            "action": "view",
            "expires_at": 1_700_000_000,
            "metadata": {"owner": 7}
        })))
        .unwrap();
        assert_eq!(payload.id, MediaId::from("abc"));
        assert_eq!(payload.action, MediaAction::View);
        assert_eq!(payload.expires_at, Some(1_700_000_000));
        assert_eq!(payload.metadata["owner"], json!(7));
    }

    #[test]
    fn from_fields_defaults_missing_optional_fields() {
        let payload =
            CapabilityPayload::from_fields(&fields(json!({"id": 1, "action": "download"})))
                .unwrap();
        assert_eq!(payload.expires_at, None);
        assert!(payload.metadata.is_empty());
    }

    #[test]
    fn from_fields_reports_invalid_action() {
        let missing = CapabilityPayload::from_fields(&fields(json!({"id": 1})));
        assert!(matches!(missing, Err(MediaError::InvalidAction)));

        let unknown =
            CapabilityPayload::from_fields(&fields(json!({"id": 1, "action": "delete"})));
        assert!(matches!(unknown, Err(MediaError::InvalidAction)));

        let wrong_type = CapabilityPayload::from_fields(&fields(json!({"id": 1, "action": 3})));
        assert!(matches!(wrong_type, Err(MediaError::InvalidAction)));
    }

    #[test]
    fn from_fields_reports_malformed_shapes() {
        for bad in [
            json!({"action": "view"}),
            json!({"id": null, "action": "view"}),
            json!({"id": 1, "action": "view", "expires_at": "soon"}),
            json!({"id": 1, "action": "view", "expires_at": 1.5}),
            json!({"id": 1, "action": "view", "metadata": [1, 2]}),
        ] {
            let result = CapabilityPayload::from_fields(&fields(bad.clone()));
            assert!(
                matches!(result, Err(MediaError::InvalidPayload)),
                "expected InvalidPayload for {bad}"
            );
        }
    }

    #[test]
    fn expiry_boundary_is_closed() {
        let payload = CapabilityPayload::new(MediaId::Int(1), MediaAction::View, Some(100));
        assert!(!payload.is_expired_at(99));
        assert!(!payload.is_expired_at(100));
        assert!(payload.is_expired_at(101));
    }

    #[test]
    fn never_expiring_payload() {
        let payload = CapabilityPayload::new(MediaId::Int(1), MediaAction::View, None);
        assert!(!payload.is_expired_at(i64::MAX));
        assert_eq!(payload.remaining_seconds(0), None);
    }

    #[test]
    fn remaining_seconds_clamps_at_zero() {
        let payload = CapabilityPayload::new(MediaId::Int(1), MediaAction::View, Some(100));
        assert_eq!(payload.remaining_seconds(40), Some(60));
        assert_eq!(payload.remaining_seconds(500), Some(0));
    }

    #[test]
    fn expiration_resolution() {
        assert_eq!(Expiration::Default.resolve(Some(60)), Some(60));
        assert_eq!(Expiration::Default.resolve(None), None);
        assert_eq!(Expiration::Never.resolve(Some(60)), None);
        assert_eq!(Expiration::Minutes(5).resolve(None), Some(5));
        assert_eq!(Expiration::from(None), Expiration::Never);
        assert_eq!(Expiration::from(Some(3)), Expiration::Minutes(3));
    }
}
