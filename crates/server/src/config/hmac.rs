use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ServerError;

/// Environment variable consulted when `[hmac].secret` is not set.
pub const SECRET_ENV: &str = "MEDIAGATE_HMAC_SECRET";

/// Capability signing configuration.
///
/// # Example
///
/// ```toml
/// [hmac]
/// secret = "change-me"
/// algorithm = "sha256"
/// default_expiration_minutes = 60   # or "never"
/// ```
#[derive(Debug, Deserialize)]
pub struct HmacConfig {
    /// Shared signing secret. Falls back to `MEDIAGATE_HMAC_SECRET`.
    #[serde(default)]
    pub secret: Option<SecretString>,
    /// Keyed hash: `sha224`, `sha256`, `sha384` or `sha512`.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Lifetime of links issued without an explicit expiration.
    #[serde(default)]
    pub default_expiration_minutes: DefaultExpiration,
}

impl Default for HmacConfig {
    fn default() -> Self {
        Self {
            secret: None,
            algorithm: default_algorithm(),
            default_expiration_minutes: DefaultExpiration::default(),
        }
    }
}

impl HmacConfig {
    /// Resolve the signing secret from the config file or the environment.
    pub fn resolve_secret(&self) -> Result<SecretString, ServerError> {
        self.resolve_secret_with(std::env::var(SECRET_ENV).ok())
    }

    /// Resolve the signing secret, using `env` as the fallback value.
    pub fn resolve_secret_with(&self, env: Option<String>) -> Result<SecretString, ServerError> {
        if let Some(secret) = &self.secret {
            return Ok(secret.clone());
        }
        env.filter(|value| !value.is_empty())
            .map(SecretString::new)
            .ok_or_else(|| {
                ServerError::Config(format!(
                    "hmac secret is required: set [hmac].secret or {SECRET_ENV}"
                ))
            })
    }
}

/// Either a positive number of minutes or the literal `"never"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DefaultExpiration {
    Minutes(i64),
    Keyword(ExpirationKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationKeyword {
    Never,
}

impl Default for DefaultExpiration {
    fn default() -> Self {
        Self::Minutes(60)
    }
}

impl DefaultExpiration {
    /// Minutes to add at issuance, or `None` for links that never expire.
    pub fn minutes(self) -> Result<Option<i64>, ServerError> {
        match self {
            Self::Minutes(minutes) if minutes > 0 => Ok(Some(minutes)),
            Self::Minutes(minutes) => Err(ServerError::Config(format!(
                "default_expiration_minutes must be positive or \"never\", got {minutes}"
            ))),
            Self::Keyword(ExpirationKeyword::Never) => Ok(None),
        }
    }
}

fn default_algorithm() -> String {
    "sha256".to_owned()
}
