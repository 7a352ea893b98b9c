//! Audit reports produced by a recode session.
//!
//! Reports carry no timestamps or durations, so two dry runs over the same
//! data produce equal reports.

use crate::models::{Value, format_key};
use serde::Serialize;

/// What happened to one row of one text column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChangeStatus {
    /// Dry run: the update was computed but not applied
    Planned,
    /// The update was applied
    Updated,
    /// The transform returned the value unchanged; nothing to write
    Unchanged,
    /// The value was NULL; nothing to transform
    Skipped { reason: String },
    /// A text column held a value that is not a string
    Rejected { reason: String },
    /// The update statement failed for this row
    Failed { reason: String },
}

impl ChangeStatus {
    pub fn is_planned(&self) -> bool {
        matches!(self, Self::Planned)
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, Self::Updated)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// One row considered for recoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowChange {
    pub column: String,
    /// Primary-key column names and values addressing the row
    pub key: Vec<(String, Value)>,
    pub old: Value,
    pub new: Value,
    #[serde(flatten)]
    pub status: ChangeStatus,
}

impl RowChange {
    /// Key rendered as `k1=v1, k2=v2`.
    pub fn key_display(&self) -> String {
        format_key(&self.key)
    }
}

/// How a table pass ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TableOutcome {
    /// Every text column was processed
    Completed,
    /// The table has text columns but no primary key
    Skipped { reason: String },
    /// A fault stopped the pass; changes listed before it stand
    Aborted { reason: String },
}

/// Result of one table pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub text_columns: Vec<String>,
    pub primary_key: Vec<String>,
    pub changes: Vec<RowChange>,
    #[serde(flatten)]
    pub outcome: TableOutcome,
}

impl TableReport {
    pub(crate) fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            text_columns: Vec::new(),
            primary_key: Vec::new(),
            changes: Vec::new(),
            outcome: TableOutcome::Completed,
        }
    }

    /// Number of changes with the given status kind.
    pub fn count(&self, matches: impl Fn(&ChangeStatus) -> bool) -> usize {
        self.changes.iter().filter(|c| matches(&c.status)).count()
    }
}

/// Conditions surfaced to the operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// Text columns left untouched because the table has no primary key
    MissingPrimaryKey { table: String, columns: Vec<String> },
    /// A table pass stopped early
    TableAborted { table: String, reason: String },
    /// A text column held a value that could not be read as a string
    UnreadableValue {
        table: String,
        column: String,
        key: String,
        reason: String,
    },
    /// A single-row update failed
    RowWriteFailed {
        table: String,
        column: String,
        key: String,
        reason: String,
    },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::MissingPrimaryKey { table, columns } => write!(
                f,
                "table '{}' has no primary key, skipped text columns: {}",
                table,
                columns.join(", ")
            ),
            Diagnostic::TableAborted { table, reason } => {
                write!(f, "table '{}' aborted: {}", table, reason)
            }
            Diagnostic::UnreadableValue {
                table,
                column,
                key,
                reason,
            } => write!(
                f,
                "{}.{} where {} was not recoded: {}",
                table, column, key, reason
            ),
            Diagnostic::RowWriteFailed {
                table,
                column,
                key,
                reason,
            } => write!(
                f,
                "update of {}.{} where {} failed: {}",
                table, column, key, reason
            ),
        }
    }
}

/// Everything a session did or would do.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionReport {
    pub dry_run: bool,
    pub transform: String,
    pub tables: Vec<TableReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SessionReport {
    pub fn new(dry_run: bool, transform: impl Into<String>) -> Self {
        Self {
            dry_run,
            transform: transform.into(),
            ..Default::default()
        }
    }

    /// Looks up the report of `table`.
    pub fn table(&self, table: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == table)
    }

    pub fn planned_count(&self) -> usize {
        self.count(ChangeStatus::is_planned)
    }

    pub fn updated_count(&self) -> usize {
        self.count(ChangeStatus::is_updated)
    }

    pub fn failed_count(&self) -> usize {
        self.count(ChangeStatus::is_failed)
    }

    pub fn rejected_count(&self) -> usize {
        self.count(ChangeStatus::is_rejected)
    }

    /// Whether any row failed or was rejected, or any table was aborted.
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
            || self.rejected_count() > 0
            || self
                .tables
                .iter()
                .any(|t| matches!(t.outcome, TableOutcome::Aborted { .. }))
    }

    fn count(&self, matches: impl Fn(&ChangeStatus) -> bool) -> usize {
        self.tables.iter().map(|t| t.count(&matches)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(status: ChangeStatus) -> RowChange {
        RowChange {
            column: "city".to_string(),
            key: vec![("id".to_string(), Value::Int(1))],
            old: Value::from("Rome"),
            new: Value::from("emoR"),
            status,
        }
    }

    #[test]
    fn test_counts() {
        let mut table = TableReport::new("people");
        table.changes = vec![
            change(ChangeStatus::Updated),
            change(ChangeStatus::Updated),
            change(ChangeStatus::Failed {
                reason: "duplicate".to_string(),
            }),
        ];
        let report = SessionReport {
            tables: vec![table],
            ..SessionReport::new(false, "reverse")
        };

        assert_eq!(report.updated_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.planned_count(), 0);
        assert!(report.has_failures());
    }

    #[test]
    fn test_aborted_table_is_a_failure() {
        let mut table = TableReport::new("shapes");
        table.outcome = TableOutcome::Aborted {
            reason: "unknown type".to_string(),
        };
        let report = SessionReport {
            tables: vec![table],
            ..SessionReport::new(true, "reverse")
        };
        assert!(report.has_failures());
    }

    #[test]
    fn test_rejected_value_is_a_failure() {
        let mut table = TableReport::new("people");
        table.changes = vec![change(ChangeStatus::Rejected {
            reason: "value is not a string: <4 bytes>".to_string(),
        })];
        let report = SessionReport {
            tables: vec![table],
            ..SessionReport::new(false, "reverse")
        };
        assert_eq!(report.rejected_count(), 1);
        assert_eq!(report.failed_count(), 0);
        assert!(report.has_failures());
    }

    #[test]
    fn test_row_change_serialization() {
        let json = serde_json::to_value(change(ChangeStatus::Planned)).unwrap();
        assert_eq!(json["status"], "planned");
        assert_eq!(json["old"], "Rome");
        assert_eq!(json["key"][0][0], "id");
        assert_eq!(json["key"][0][1], 1);
    }

    #[test]
    fn test_diagnostic_display() {
        let diagnostic = Diagnostic::MissingPrimaryKey {
            table: "audit".to_string(),
            columns: vec!["message".to_string()],
        };
        assert_eq!(
            diagnostic.to_string(),
            "table 'audit' has no primary key, skipped text columns: message"
        );
    }
}
