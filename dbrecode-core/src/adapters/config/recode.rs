//! Recode session configuration.

use crate::classifier::TypeClassifier;
use crate::models::MYSQL_PRIMARY_KEY_MARKER;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Settings for one recode session.
///
/// Dry-run is the default: nothing is written unless `dry_run` is
/// explicitly set to `false`.
///
/// # Example
/// ```rust
/// use dbrecode_core::adapters::RecodeConfig;
///
/// let config = RecodeConfig::default()
///     .with_extra_type("geometry", false)
///     .with_tables(vec!["people".to_string()]);
///
/// assert!(config.dry_run);
/// assert!(config.includes_table("people"));
/// assert!(!config.includes_table("orders"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecodeConfig {
    /// Compute and report changes without writing them
    pub dry_run: bool,
    /// Key flag value marking primary-key columns in the schema catalog
    pub primary_key_marker: String,
    /// Additional type classifications, overriding the built-in map
    pub extra_types: BTreeMap<String, bool>,
    /// Tables to process; empty means every table
    pub tables: Vec<String>,
    /// Tables to skip
    pub exclude_tables: Vec<String>,
}

impl Default for RecodeConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            primary_key_marker: MYSQL_PRIMARY_KEY_MARKER.to_string(),
            extra_types: BTreeMap::new(),
            tables: Vec::new(),
            exclude_tables: Vec::new(),
        }
    }
}

impl RecodeConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns error if the primary-key marker is empty or a table is both
    /// included and excluded.
    pub fn validate(&self) -> crate::Result<()> {
        if self.primary_key_marker.is_empty() {
            return Err(crate::error::RecodeError::configuration(
                "primary_key_marker cannot be empty",
            ));
        }

        if let Some(table) = self
            .tables
            .iter()
            .find(|t| self.exclude_tables.contains(*t))
        {
            return Err(crate::error::RecodeError::configuration(format!(
                "table '{}' is both included and excluded",
                table
            )));
        }

        Ok(())
    }

    /// Builder method to set dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Builder method to set the primary-key marker.
    pub fn with_primary_key_marker(mut self, marker: impl Into<String>) -> Self {
        self.primary_key_marker = marker.into();
        self
    }

    /// Builder method to add a type classification.
    pub fn with_extra_type(mut self, type_name: impl Into<String>, is_text: bool) -> Self {
        self.extra_types.insert(type_name.into(), is_text);
        self
    }

    /// Builder method to restrict processing to the given tables.
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.tables = tables;
        self
    }

    /// Builder method to skip the given tables.
    pub fn with_exclude_tables(mut self, tables: Vec<String>) -> Self {
        self.exclude_tables = tables;
        self
    }

    /// Built-in type map extended with `extra_types`.
    pub fn classifier(&self) -> TypeClassifier {
        TypeClassifier::default().extend(
            self.extra_types
                .iter()
                .map(|(name, text)| (name.clone(), *text)),
        )
    }

    /// Whether `table` is selected for processing.
    pub fn includes_table(&self, table: &str) -> bool {
        (self.tables.is_empty() || self.tables.iter().any(|t| t == table))
            && !self.exclude_tables.iter().any(|t| t == table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_dry_run_with_mysql_marker() {
        let config = RecodeConfig::default();
        assert!(config.dry_run);
        assert_eq!(config.primary_key_marker, "PRI");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_marker_is_rejected() {
        let config = RecodeConfig::default().with_primary_key_marker("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overlapping_selection_is_rejected() {
        let config = RecodeConfig::default()
            .with_tables(vec!["a".to_string()])
            .with_exclude_tables(vec!["a".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_table_selection() {
        let config = RecodeConfig::default().with_exclude_tables(vec!["logs".to_string()]);
        assert!(config.includes_table("people"));
        assert!(!config.includes_table("logs"));
    }

    #[test]
    fn test_classifier_includes_extra_types() {
        let config = RecodeConfig::default()
            .with_extra_type("geometry", false)
            .with_extra_type("enum", true);
        let classifier = config.classifier();
        assert_eq!(classifier.lookup("geometry"), Some(false));
        assert_eq!(classifier.lookup("enum"), Some(true));
        assert_eq!(classifier.lookup("varchar"), Some(true));
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let config: RecodeConfig = serde_json::from_str(r#"{"tables": ["people"]}"#).unwrap();
        assert!(config.dry_run);
        assert_eq!(config.primary_key_marker, "PRI");
        assert_eq!(config.tables, vec!["people".to_string()]);
    }
}
