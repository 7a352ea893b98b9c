//! ISO calendar dates (`yyyy-MM-dd`).

use crate::{Result, error::RecodeError};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;

const ISO_DATE_PATTERN: &str = r"^([0-9]{4})-(1[0-2]|0[1-9])-(3[0-1]|[1-2][0-9]|0[1-9])$";

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(ISO_DATE_PATTERN).expect("Invalid ISO date pattern"))
}

/// A calendar date written as `yyyy-MM-dd`.
///
/// The text must match the ISO shape exactly and name a real day:
/// `2023-02-29` is rejected rather than rolled over into March.
///
/// # Example
/// ```rust
/// use dbrecode_core::datatype::IsoDate;
///
/// let date = IsoDate::parse("2024-03-05").unwrap();
/// assert_eq!(date.format_long(), "March 5, 2024");
/// assert!(IsoDate::parse("2024-3-5").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IsoDate(NaiveDate);

impl IsoDate {
    /// Parses an ISO date.
    ///
    /// # Errors
    /// Returns a validation error if the shape is wrong or the day does not
    /// exist.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || RecodeError::validation("ISO date", value);
        let captures = iso_date_pattern().captures(value).ok_or_else(invalid)?;

        let field = |i: usize| -> Option<u32> { captures.get(i)?.as_str().parse().ok() };
        let (Some(year), Some(month), Some(day)) = (field(1), field(2), field(3)) else {
            return Err(invalid());
        };
        let year = i32::try_from(year).map_err(|_| invalid())?;

        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(invalid)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Long English form, e.g. `March 5, 2024`.
    pub fn format_long(&self) -> String {
        format!(
            "{} {}, {}",
            self.0.format("%B"),
            self.0.day(),
            self.0.year()
        )
    }
}

impl From<NaiveDate> for IsoDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl FromStr for IsoDate {
    type Err = RecodeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IsoDate {
    type Error = RecodeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<IsoDate> for String {
    fn from(date: IsoDate) -> Self {
        date.to_string()
    }
}

impl std::fmt::Display for IsoDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_dates() {
        let date = IsoDate::parse("2011-12-31").unwrap();
        assert_eq!(date.date(), NaiveDate::from_ymd_opt(2011, 12, 31).unwrap());
        assert_eq!(date.to_string(), "2011-12-31");

        assert!(IsoDate::parse("2024-02-29").is_ok());
        assert!(IsoDate::parse("0001-01-01").is_ok());
    }

    #[test]
    fn test_wrong_shape_is_rejected() {
        for value in [
            "", "2011-1-01", "2011-01-1", "11-01-01", "2011/01/01", "2011-13-01", "2011-00-10",
            "2011-01-32", "2011-01-00", " 2011-01-01", "2011-01-01T00:00",
        ] {
            assert!(IsoDate::parse(value).is_err(), "{:?} should be invalid", value);
        }
    }

    #[test]
    fn test_impossible_day_is_rejected() {
        assert!(IsoDate::parse("2023-02-29").is_err());
        assert!(IsoDate::parse("2011-04-31").is_err());
    }

    #[test]
    fn test_format_long() {
        assert_eq!(
            IsoDate::parse("2011-01-09").unwrap().format_long(),
            "January 9, 2011"
        );
    }

    #[test]
    fn test_serde_round_trip_uses_iso_text() {
        let date = IsoDate::parse("2020-06-15").unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2020-06-15\"");
        assert_eq!(serde_json::from_str::<IsoDate>(&json).unwrap(), date);
    }
}
