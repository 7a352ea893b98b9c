//! Italian postal codes (CAP).

use crate::{Result, error::RecodeError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// An Italian post code: exactly five ASCII digits.
///
/// # Example
/// ```rust
/// use dbrecode_core::datatype::ItalianPostCode;
///
/// let cap: ItalianPostCode = "00184".parse().unwrap();
/// assert_eq!(cap.as_str(), "00184");
/// assert!("0018".parse::<ItalianPostCode>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItalianPostCode(String);

impl ItalianPostCode {
    const LENGTH: usize = 5;

    /// Whether `value` is a well-formed post code.
    pub fn is_valid(value: &str) -> bool {
        value.len() == Self::LENGTH && value.bytes().all(|b| b.is_ascii_digit())
    }

    /// Parses a post code.
    ///
    /// # Errors
    /// Returns a validation error unless `value` is exactly five digits.
    pub fn parse(value: &str) -> Result<Self> {
        if Self::is_valid(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(RecodeError::validation("Italian post code", value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ItalianPostCode {
    type Err = RecodeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ItalianPostCode {
    type Error = RecodeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ItalianPostCode> for String {
    fn from(code: ItalianPostCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for ItalianPostCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
