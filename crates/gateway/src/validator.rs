use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use mediagate_core::{CapabilityPayload, MediaError, decode_payload};
use mediagate_crypto::Signer;

/// The two transport fields carrying a capability.
///
/// Deserializes directly from a query string; unknown parameters are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SignatureQuery {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl SignatureQuery {
    pub fn new(data: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            signature: Some(signature.into()),
        }
    }
}

/// Verifies capabilities in a fixed order: presence, signature, decode,
/// action, expiry.
///
/// Nothing from `data` is interpreted before its signature has been checked.
#[derive(Debug, Clone)]
pub struct CapabilityValidator {
    signer: Signer,
}

impl CapabilityValidator {
    pub fn new(signer: Signer) -> Self {
        Self { signer }
    }

    /// Validate against the current time.
    pub fn validate(&self, query: &SignatureQuery) -> Result<CapabilityPayload, MediaError> {
        self.validate_at(query, Utc::now().timestamp())
    }

    /// Validate against `now` (unix seconds).
    pub fn validate_at(
        &self,
        query: &SignatureQuery,
        now: i64,
    ) -> Result<CapabilityPayload, MediaError> {
        let (Some(data), Some(signature)) = (
            non_empty(query.data.as_deref()),
            non_empty(query.signature.as_deref()),
        ) else {
            return Err(MediaError::MissingSignatureData);
        };

        if !self.signer.verify(data, signature) {
            return Err(MediaError::InvalidSignature);
        }

        let fields = decode_payload(data).map_err(|e| {
            debug!(error = %e, "signed payload failed to decode");
            MediaError::InvalidPayload
        })?;
        let payload = CapabilityPayload::from_fields(&fields)?;

        if payload.is_expired_at(now) {
            return Err(MediaError::ExpiredLink);
        }
        Ok(payload)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as B64;
    use mediagate_core::{MediaAction, MediaId, encode_payload};
    use mediagate_crypto::{HmacAlgorithm, SecretString};
    use serde_json::{Map, json};

    use super::*;

    fn signer() -> Signer {
        Signer::new(&SecretString::new("test-secret".into()), HmacAlgorithm::Sha256).unwrap()
    }

    fn signed(payload: &CapabilityPayload) -> SignatureQuery {
        let data = encode_payload(payload);
        let signature = signer().sign(&data);
        SignatureQuery::new(data, signature)
    }

    const NOW: i64 = 1_700_000_000;

    fn validator() -> CapabilityValidator {
        CapabilityValidator::new(signer())
    }

    #[test]
    fn round_trip_recovers_payload() {
        let mut metadata = Map::new();
        metadata.insert("tenant".into(), json!("acme"));
        let payload = CapabilityPayload::new(MediaId::from("abc"), MediaAction::View, Some(NOW + 60))
            .with_metadata(metadata);

        let recovered = validator().validate_at(&signed(&payload), NOW).unwrap();
        assert_eq!(recovered, payload);
    }

    #[test]
    fn concrete_download_scenario() {
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::Download, None);
        let recovered = validator().validate_at(&signed(&payload), NOW).unwrap();
        assert_eq!(recovered, payload);
    }

    #[test]
    fn missing_or_empty_fields() {
        let v = validator();
        for query in [
            SignatureQuery::default(),
            SignatureQuery {
                data: Some("abc".into()),
                signature: None,
            },
            SignatureQuery {
                data: None,
                signature: Some("abc".into()),
            },
            SignatureQuery::new("", "abc"),
            SignatureQuery::new("abc", ""),
        ] {
            let err = v.validate_at(&query, NOW).unwrap_err();
            assert!(matches!(err, MediaError::MissingSignatureData), "{query:?}");
            assert_eq!(err.status(), 400);
        }
    }

    #[test]
    fn wrong_signature_is_rejected() {
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::Download, None);
        let mut query = signed(&payload);
        query.signature = Some("not-a-real-signature".into());

        let err = validator().validate_at(&query, NOW).unwrap_err();
        assert!(matches!(err, MediaError::InvalidSignature));
        assert_eq!(err.status(), 403);
    }

    #[test]
    fn any_single_character_flip_is_rejected() {
        let payload = CapabilityPayload::new(MediaId::Int(7), MediaAction::View, Some(NOW + 600));
        let original = signed(&payload);
        let v = validator();

        let flip = |s: &str, i: usize| -> String {
            let mut chars: Vec<char> = s.chars().collect();
            chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
            chars.into_iter().collect()
        };

        let data = original.data.clone().unwrap();
        let signature = original.signature.clone().unwrap();
        for i in 0..data.len() {
            let query = SignatureQuery::new(flip(&data, i), signature.clone());
            assert!(
                matches!(v.validate_at(&query, NOW), Err(MediaError::InvalidSignature)),
                "data flip at {i}"
            );
        }
        for i in 0..signature.len() {
            let query = SignatureQuery::new(data.clone(), flip(&signature, i));
            assert!(
                matches!(v.validate_at(&query, NOW), Err(MediaError::InvalidSignature)),
                "signature flip at {i}"
            );
        }
    }

    #[test]
    fn other_secret_is_rejected() {
        let payload = CapabilityPayload::new(MediaId::Int(1), MediaAction::View, None);
        let other = Signer::new(&SecretString::new("other".into()), HmacAlgorithm::Sha256).unwrap();
        let data = encode_payload(&payload);
        let query = SignatureQuery::new(data.clone(), other.sign(&data));
        assert!(matches!(
            validator().validate_at(&query, NOW),
            Err(MediaError::InvalidSignature)
        ));
    }

    #[test]
    fn signed_garbage_is_invalid_payload() {
        let v = validator();
        for data in ["%%%not-base64%%%", "WzEsMiwzXQ==", "bm90IGpzb24="] {
            let query = SignatureQuery::new(data, signer().sign(data));
            assert!(
                matches!(v.validate_at(&query, NOW), Err(MediaError::InvalidPayload)),
                "{data}"
            );
        }
    }

    #[test]
    fn signed_unknown_action_is_invalid_action() {
        let data = base64_json(&json!({"id": 1, "action": "delete", "expires_at": null}));
        let query = SignatureQuery::new(data.clone(), signer().sign(&data));
        let err = validator().validate_at(&query, NOW).unwrap_err();
        assert!(matches!(err, MediaError::InvalidAction));
        assert_eq!(err.status(), 400);
    }

    fn base64_json(value: &serde_json::Value) -> String {
        B64.encode(value.to_string())
    }

    #[test]
    fn expiry_boundary_is_closed() {
        let v = validator();
        let payload = CapabilityPayload::new(MediaId::Int(1), MediaAction::View, Some(NOW));
        let query = signed(&payload);
        assert!(v.validate_at(&query, NOW - 1).is_ok());
        assert!(v.validate_at(&query, NOW).is_ok());
        let err = v.validate_at(&query, NOW + 1).unwrap_err();
        assert!(matches!(err, MediaError::ExpiredLink));
        assert_eq!(err.status(), 403);
    }

    #[test]
    fn expired_a_minute_ago() {
        let payload = CapabilityPayload::new(MediaId::Int(42), MediaAction::Download, Some(NOW - 60));
        assert!(matches!(
            validator().validate_at(&signed(&payload), NOW),
            Err(MediaError::ExpiredLink)
        ));
    }

    #[test]
    fn no_expiry_never_expires() {
        let payload = CapabilityPayload::new(MediaId::Int(1), MediaAction::View, None);
        assert!(validator().validate_at(&signed(&payload), i64::MAX).is_ok());
    }

    #[test]
    fn query_deserializes_and_ignores_extra_fields() {
        let query: SignatureQuery =
            serde_json::from_value(json!({"data": "abc", "signature": "def", "extra": 1})).unwrap();
        assert_eq!(query, SignatureQuery::new("abc", "def"));
    }
}
