//! Column type classification.
//!
//! Decides whether a normalized column type holds re-encodable text. The
//! mapping is an explicit table: a type that is not listed is an error, never
//! a guess. Treating an unknown type as text could feed binary or numeric
//! data through a string transform; treating it as non-text could silently
//! skip data that needed recoding.

use crate::{Result, error::RecodeError};
use std::collections::BTreeMap;

/// MySQL types recognized out of the box, as `(type name, is text)`.
///
/// Names are matched exactly as `INFORMATION_SCHEMA.COLUMNS.COLUMN_TYPE`
/// reports them once the size suffix is stripped (lowercase). Servers that
/// omit integer display widths report `int unsigned` rather than
/// `int(10) unsigned`, hence the separate unsigned entries.
pub const DEFAULT_TYPE_MAP: &[(&str, bool)] = &[
    // Text
    ("char", true),
    ("varchar", true),
    ("tinytext", true),
    ("text", true),
    ("mediumtext", true),
    ("longtext", true),
    // Integer
    ("tinyint", false),
    ("smallint", false),
    ("mediumint", false),
    ("int", false),
    ("bigint", false),
    ("tinyint unsigned", false),
    ("smallint unsigned", false),
    ("mediumint unsigned", false),
    ("int unsigned", false),
    ("bigint unsigned", false),
    ("bit", false),
    // Decimal and floating point
    ("decimal", false),
    ("float", false),
    ("double", false),
    // Temporal
    ("date", false),
    ("datetime", false),
    ("timestamp", false),
    ("time", false),
    ("year", false),
    // Enumerated
    ("enum", false),
    ("set", false),
    // Binary
    ("binary", false),
    ("varbinary", false),
    ("tinyblob", false),
    ("blob", false),
    ("mediumblob", false),
    ("longblob", false),
];

/// Maps normalized column types to text/non-text.
///
/// # Example
/// ```rust
/// use dbrecode_core::classifier::TypeClassifier;
///
/// let classifier = TypeClassifier::default().with_type("geometry", false);
/// assert!(classifier.is_text("varchar").unwrap());
/// assert!(!classifier.is_text("geometry").unwrap());
/// assert!(classifier.is_text("VARCHAR").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeClassifier {
    types: BTreeMap<String, bool>,
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::from_entries(DEFAULT_TYPE_MAP.iter().map(|(name, text)| (*name, *text)))
    }
}

impl TypeClassifier {
    /// Creates a classifier that recognizes no types at all.
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
        }
    }

    /// Creates a classifier from `(type name, is text)` pairs.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            types: entries
                .into_iter()
                .map(|(name, text)| (name.into(), text))
                .collect(),
        }
    }

    /// Adds or replaces a type entry.
    pub fn with_type(mut self, type_name: impl Into<String>, is_text: bool) -> Self {
        self.types.insert(type_name.into(), is_text);
        self
    }

    /// Adds every entry of `extra`, overriding existing ones.
    pub fn extend<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        self.types
            .extend(extra.into_iter().map(|(name, text)| (name.into(), text)));
        self
    }

    /// Returns whether `normalized_type` holds re-encodable text.
    ///
    /// # Errors
    /// Returns `RecodeError::UnknownType` when the type is not in the map.
    /// The column is unknown at this level and reported as `?`; callers with
    /// a column at hand should go through `ColumnDescriptor::is_text`.
    pub fn is_text(&self, normalized_type: &str) -> Result<bool> {
        self.lookup(normalized_type)
            .ok_or_else(|| RecodeError::unknown_type("?", normalized_type))
    }

    /// Returns the classification, or `None` for an unrecognized type.
    pub fn lookup(&self, normalized_type: &str) -> Option<bool> {
        self.types.get(normalized_type).copied()
    }

    /// Number of recognized types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no types are recognized.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_text_types() {
        let classifier = TypeClassifier::default();
        for name in ["char", "varchar", "text", "tinytext", "mediumtext", "longtext"] {
            assert!(classifier.is_text(name).unwrap(), "{} should be text", name);
        }
    }

    #[test]
    fn test_default_non_text_types() {
        let classifier = TypeClassifier::default();
        for name in [
            "int", "smallint", "tinyint", "mediumint", "decimal", "double", "date", "datetime",
            "timestamp", "year", "enum", "set", "blob", "mediumblob", "longblob",
        ] {
            assert!(!classifier.is_text(name).unwrap(), "{} should not be text", name);
        }
    }

    #[test]
    fn test_unknown_type_fails_loudly() {
        let classifier = TypeClassifier::default();
        let err = classifier.is_text("geometry").unwrap_err();
        assert!(matches!(
            err,
            RecodeError::UnknownType { ref type_name, .. } if type_name == "geometry"
        ));
    }

    #[test]
    fn test_no_case_normalization() {
        let classifier = TypeClassifier::default();
        assert!(classifier.is_text("VARCHAR").is_err());
        assert!(classifier.is_text("Int").is_err());
    }

    #[test]
    fn test_no_partial_matching() {
        let classifier = TypeClassifier::default();
        assert!(classifier.is_text("varchar(20)").is_err());
        assert!(classifier.is_text("var").is_err());
    }

    #[test]
    fn test_extension_overrides_and_adds() {
        let classifier = TypeClassifier::default()
            .extend([("json", false), ("enum", true)])
            .with_type("nvarchar", true);

        assert_eq!(classifier.lookup("json"), Some(false));
        assert_eq!(classifier.lookup("enum"), Some(true));
        assert_eq!(classifier.lookup("nvarchar"), Some(true));
        assert_eq!(classifier.len(), DEFAULT_TYPE_MAP.len() + 2);
    }

    #[test]
    fn test_empty_classifier_recognizes_nothing() {
        let classifier = TypeClassifier::empty();
        assert!(classifier.is_empty());
        assert!(classifier.is_text("varchar").is_err());
    }
}
