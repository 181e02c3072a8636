use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a stored media record.
///
/// Records created by the bundled repositories use integer ids, but any
/// backend may hand out string ids instead. The signed payload carries the id
/// verbatim, so `42` and `"42"` are distinct identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MediaId {
    /// Numeric identifier (e.g. an auto-increment primary key).
    Int(i64),
    /// Opaque string identifier (e.g. a UUID).
    Str(String),
}

impl MediaId {
    /// Interpret a JSON value as an identifier.
    ///
    /// Only integers and strings qualify; floats, booleans, arrays, objects
    /// and `null` return `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(Self::Int),
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for MediaId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for MediaId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_owned())
    }
}

impl From<String> for MediaId {
    fn from(id: String) -> Self {
        Self::Str(id)
    }
}

/// Parses a path segment: valid `i64` values become [`MediaId::Int`],
/// everything else becomes [`MediaId::Str`].
impl FromStr for MediaId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>().map_or_else(|_| Self::Str(s.to_owned()), Self::Int))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_untagged() {
        assert_eq!(serde_json::to_string(&MediaId::Int(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&MediaId::from("abc")).unwrap(),
            "\"abc\""
        );
    }

    #[test]
    fn from_json_rejects_non_scalar_ids() {
        assert_eq!(
            MediaId::from_json(&serde_json::json!(7)),
            Some(MediaId::Int(7))
        );
        assert_eq!(
            MediaId::from_json(&serde_json::json!("x")),
            Some(MediaId::from("x"))
        );
        assert!(MediaId::from_json(&serde_json::json!(1.5)).is_none());
        assert!(MediaId::from_json(&serde_json::json!(null)).is_none());
        assert!(MediaId::from_json(&serde_json::json!([1])).is_none());
    }

    #[test]
    fn path_segment_parsing() {
        assert_eq!("12".parse::<MediaId>().unwrap(), MediaId::Int(12));
        assert_eq!(
            "a1b2".parse::<MediaId>().unwrap(),
            MediaId::Str("a1b2".into())
        );
    }
}
