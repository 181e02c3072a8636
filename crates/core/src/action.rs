use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a capability lets its bearer do with the referenced file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaAction {
    /// Render the file in the client (`Content-Disposition: inline`).
    #[default]
    View,
    /// Save the file (`Content-Disposition: attachment`).
    Download,
}

impl MediaAction {
    /// Wire name used inside the signed payload.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Download => "download",
        }
    }

    /// Disposition type emitted in the `Content-Disposition` header.
    pub fn disposition(self) -> &'static str {
        match self {
            Self::View => "inline",
            Self::Download => "attachment",
        }
    }
}

impl fmt::Display for MediaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names neither `view` nor `download`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media action: {0}")]
pub struct UnknownAction(pub String);

impl FromStr for MediaAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(Self::View),
            "download" => Ok(Self::Download),
            other => Err(UnknownAction(other.to_owned())),
        }
    }
}
