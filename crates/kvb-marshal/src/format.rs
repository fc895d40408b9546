//! The closed set of marshal formats a store can be configured with.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MarshalError;

/// Prefix used in the textual form of [`MarshalFormat::Custom`].
const CUSTOM_PREFIX: &str = "custom:";

/// Identifies how values are converted to and from encoded records.
///
/// The textual form is `json`, `bincode` or `custom:<name>` (the name may be
/// empty, so every value displays as text that parses back); anything else
/// is rejected when parsed, so a bad format is caught while a configuration
/// is being read rather than on the first write.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MarshalFormat {
    /// Textual structured format (`serde_json`).
    #[default]
    Json,
    /// Compact binary format (`bincode`).
    Bincode,
    /// A format supplied by the application and registered by name.
    Custom(String),
}

impl MarshalFormat {
    /// Shorthand for a named custom format.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Numeric code of a built-in format. Custom formats have none.
    pub fn code(&self) -> Option<u8> {
        match self {
            Self::Json => Some(0),
            Self::Bincode => Some(1),
            Self::Custom(_) => None,
        }
    }

    /// Returns `true` for the formats every default registry provides.
    pub fn is_builtin(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for MarshalFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Bincode => write!(f, "bincode"),
            Self::Custom(name) => write!(f, "{CUSTOM_PREFIX}{name}"),
        }
    }
}

impl FromStr for MarshalFormat {
    type Err = MarshalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "bincode" => Ok(Self::Bincode),
            other => match other.strip_prefix(CUSTOM_PREFIX) {
                Some(name) => Ok(Self::Custom(name.to_string())),
                None => Err(MarshalError::UnsupportedFormat(format!(
                    "unknown format name {other:?}"
                ))),
            },
        }
    }
}

impl TryFrom<u8> for MarshalFormat {
    type Error = MarshalError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Json),
            1 => Ok(Self::Bincode),
            other => Err(MarshalError::UnsupportedFormat(format!(
                "unknown format code {other}"
            ))),
        }
    }
}

impl TryFrom<String> for MarshalFormat {
    type Error = MarshalError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MarshalFormat> for String {
    fn from(format: MarshalFormat) -> Self {
        format.to_string()
    }
}
