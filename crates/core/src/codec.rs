//! Transport encoding of capability payloads.
//!
//! A payload is serialized to compact JSON and then base64-encoded (standard
//! alphabet, padded). The resulting string is exactly what the signer MACs;
//! any URL-encoding happens later, at transport framing.
//!
//! Decoding is purely syntactic: it recovers a JSON object and nothing more.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as B64;
use thiserror::Error;

use crate::payload::{CapabilityPayload, PayloadFields};

/// Reasons an encoded payload could not be turned back into a mapping.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Encode a payload into its transport-safe string form.
pub fn encode_payload(payload: &CapabilityPayload) -> String {
    // Serializing a struct of plain JSON types cannot fail.
    let json = serde_json::to_vec(payload).unwrap_or_default();
    B64.encode(json)
}

/// Reverse [`encode_payload`], yielding the raw field mapping.
pub fn decode_payload(encoded: &str) -> Result<PayloadFields, DecodeError> {
    let bytes = B64.decode(encoded.trim())?;
    match serde_json::from_slice::<serde_json::Value>(&bytes)? {
        serde_json::Value::Object(fields) => Ok(fields),
        _ => Err(DecodeError::NotAnObject),
    }
}
