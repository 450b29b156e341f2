//! Canonical extension identifiers.

use crate::error::{ExtensionInfoError, ExtensionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of every Chrome Web Store extension ID
pub const EXTENSION_ID_LEN: usize = 32;

/// A validated, canonical Chrome Web Store extension ID.
///
/// Construction always goes through [`ExtensionId::parse`], so holding one is
/// proof that the value is exactly 32 lowercase ASCII alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExtensionId(String);

impl ExtensionId {
    /// Validate a candidate ID. Surrounding whitespace is ignored; case is not
    /// folded, so uppercase input is rejected.
    pub fn parse(candidate: &str) -> ExtensionResult<Self> {
        let trimmed = candidate.trim();
        if Self::is_valid(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(ExtensionInfoError::InvalidIdentifier {
                candidate: candidate.to_string(),
            })
        }
    }

    /// Check the canonical shape without allocating
    pub fn is_valid(candidate: &str) -> bool {
        candidate.len() == EXTENSION_ID_LEN
            && candidate
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ExtensionId {
    type Err = ExtensionInfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ExtensionId {
    type Error = ExtensionInfoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ExtensionId> for String {
    fn from(id: ExtensionId) -> Self {
        id.0
    }
}

impl AsRef<str> for ExtensionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
