//! Defines [`RegionCode`], the identifier of a forecast area.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a forecast area as used by the upstream forecast service
/// (e.g. `"130000"` for Tokyo).
///
/// The code is treated as opaque: only equality and hashing are meaningful.
///
/// # Examples
///
/// ```
/// use jma_forecast::RegionCode;
///
/// let tokyo = RegionCode::from("130000");
/// assert_eq!(tokyo.as_str(), "130000");
/// assert_eq!(tokyo.to_string(), "130000");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionCode(String);

impl RegionCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionCode {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RegionCode {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for RegionCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for RegionCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for RegionCode {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
