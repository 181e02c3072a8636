//! HMAC signing for mediagate capabilities.
//!
//! The signer MACs the *encoded* payload string exactly as it travels in the
//! `data` field, and renders the tag as lowercase hex. Verification recomputes
//! the tag and compares it in constant time.
//!
//! The secret is held in a [`SigningKey`] that is zeroized on drop and whose
//! [`Debug`](fmt::Debug) output is redacted.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::{Sha224, Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

// Re-export for consumers so they don't need a direct `secrecy` dependency.
pub use secrecy::{ExposeSecret, SecretString};

/// Errors raised while constructing a [`Signer`]. These are configuration
/// problems and surface at startup, never per request.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The configured secret is empty.
    #[error("hmac secret must not be empty")]
    EmptySecret,

    /// The configured algorithm is not a supported keyed hash.
    #[error("unsupported hmac algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Hash functions available for the HMAC construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HmacAlgorithm {
    Sha224,
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HmacAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha224 => "sha224",
            Self::Sha256 => "sha256",
            Self::Sha384 => "sha384",
            Self::Sha512 => "sha512",
        }
    }

    /// Length of the hex-encoded tag produced by this algorithm.
    pub fn hex_len(self) -> usize {
        match self {
            Self::Sha224 => 56,
            Self::Sha256 => 64,
            Self::Sha384 => 96,
            Self::Sha512 => 128,
        }
    }
}

impl fmt::Display for HmacAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HmacAlgorithm {
    type Err = SignerError;

    /// Case-insensitive; accepts `sha256` as well as `sha-256` / `hmac-sha256`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "");
        match normalized.strip_prefix("hmac").unwrap_or(&normalized) {
            "sha224" => Ok(Self::Sha224),
            "sha256" => Ok(Self::Sha256),
            "sha384" => Ok(Self::Sha384),
            "sha512" => Ok(Self::Sha512),
            _ => Err(SignerError::UnsupportedAlgorithm(s.to_owned())),
        }
    }
}

/// Raw HMAC key material, zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningKey(Vec<u8>);

impl SigningKey {
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey([REDACTED])")
    }
}

/// Computes and verifies capability signatures.
#[derive(Debug, Clone)]
pub struct Signer {
    key: SigningKey,
    algorithm: HmacAlgorithm,
}

impl Signer {
    /// Create a signer from a secret and algorithm.
    ///
    /// Returns [`SignerError::EmptySecret`] for an empty secret. The secret's
    /// UTF-8 bytes are used as the key, unchanged.
    pub fn new(secret: &SecretString, algorithm: HmacAlgorithm) -> Result<Self, SignerError> {
        let raw = secret.expose_secret();
        if raw.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        Ok(Self {
            key: SigningKey(raw.as_bytes().to_vec()),
            algorithm,
        })
    }

    /// Convenience constructor parsing the algorithm name.
    pub fn from_config(secret: &SecretString, algorithm: &str) -> Result<Self, SignerError> {
        Self::new(secret, algorithm.parse()?)
    }

    pub fn algorithm(&self) -> HmacAlgorithm {
        self.algorithm
    }

    /// Hex-encoded HMAC of `data`.
    pub fn sign(&self, data: &str) -> String {
        let key = self.key.as_bytes();
        let tag = match self.algorithm {
            HmacAlgorithm::Sha224 => mac::<Hmac<Sha224>>(key, data.as_bytes()),
            HmacAlgorithm::Sha256 => mac::<Hmac<Sha256>>(key, data.as_bytes()),
            HmacAlgorithm::Sha384 => mac::<Hmac<Sha384>>(key, data.as_bytes()),
            HmacAlgorithm::Sha512 => mac::<Hmac<Sha512>>(key, data.as_bytes()),
        };
        hex::encode(tag)
    }

    /// Check `signature` against the tag recomputed over `data`.
    ///
    /// The comparison is constant-time with respect to the signature contents;
    /// a length mismatch returns `false` without inspecting bytes.
    pub fn verify(&self, data: &str, signature: &str) -> bool {
        let expected = self.sign(data);
        expected.as_bytes().ct_eq(signature.as_bytes()).into()
    }
}

fn mac<M>(key: &[u8], data: &[u8]) -> Vec<u8>
where
    M: Mac + hmac::digest::KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(key).expect("HMAC accepts any key size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
