//! Validated single-field value types.
//!
//! These are leaf objects with no connection to the recode engine. Each one
//! can only be constructed from valid input; parsing fails with
//! `RecodeError::Validation`.

mod iso_date;
mod post_code;
mod tax_id;

pub use iso_date::IsoDate;
pub use post_code::ItalianPostCode;
pub use tax_id::FrenchPersonalTaxId;
