//! French personal tax identifiers.

use crate::{Result, error::RecodeError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A French personal tax id.
///
/// No checksum is verified; any non-blank value is accepted and stored
/// trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FrenchPersonalTaxId(String);

impl FrenchPersonalTaxId {
    pub fn is_valid(value: &str) -> bool {
        !value.trim().is_empty()
    }

    /// Parses a tax id.
    ///
    /// # Errors
    /// Returns a validation error for blank input.
    pub fn parse(value: &str) -> Result<Self> {
        if Self::is_valid(value) {
            Ok(Self(value.trim().to_string()))
        } else {
            Err(RecodeError::validation("French personal tax id", value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FrenchPersonalTaxId {
    type Err = RecodeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FrenchPersonalTaxId {
    type Error = RecodeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<FrenchPersonalTaxId> for String {
    fn from(id: FrenchPersonalTaxId) -> Self {
        id.0
    }
}

impl std::fmt::Display for FrenchPersonalTaxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_any_non_blank_value() {
        let id = FrenchPersonalTaxId::parse(" 1 23 45 678 901 2 ").unwrap();
        assert_eq!(id.as_str(), "1 23 45 678 901 2");
    }

    #[test]
    fn test_rejects_blank() {
        assert!("".parse::<FrenchPersonalTaxId>().is_err());
        assert!("   ".parse::<FrenchPersonalTaxId>().is_err());
    }
}
