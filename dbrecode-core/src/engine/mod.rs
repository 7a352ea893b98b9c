//! Recode engine: walks every table and rewrites each text value.
//!
//! For each table the engine classifies all columns first, so an unknown
//! type stops the table before anything in it is read or written. It then
//! resolves the primary key, reads `(value, key...)` tuples for one text
//! column at a time, applies the transform, and either records the intended
//! change (dry run) or issues one keyed update per row.
//!
//! Fault handling follows three granularities:
//! - connection faults end the session,
//! - unknown types, correlation mismatches and read/metadata faults end the
//!   current table pass,
//! - a failed update is recorded against its row and the pass continues.

mod report;
mod session;
mod transform;

pub use report::{ChangeStatus, Diagnostic, RowChange, SessionReport, TableOutcome, TableReport};
pub use session::{RecodeSession, SessionState};
pub use transform::Transform;

use crate::adapters::{DatabaseAccess, RecodeConfig};
use crate::classifier::TypeClassifier;
use crate::models::{RowCorrelation, Value};
use crate::walker::SchemaWalker;
use crate::{Result, error::RecodeError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Drives recode passes over a borrowed connection.
#[derive(Debug, Clone)]
pub struct RecodeEngine {
    config: RecodeConfig,
    classifier: Arc<TypeClassifier>,
    transform: Transform,
}

impl RecodeEngine {
    /// Creates an engine from a validated configuration.
    ///
    /// # Errors
    /// Returns a configuration error if `config` fails validation.
    pub fn new(config: RecodeConfig, transform: Transform) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            classifier: Arc::new(config.classifier()),
            config,
            transform,
        })
    }

    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    pub fn config(&self) -> &RecodeConfig {
        &self.config
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// An empty report for a session run by this engine.
    pub fn new_report(&self) -> SessionReport {
        SessionReport::new(self.config.dry_run, self.transform.name())
    }

    fn walker<'c, A: DatabaseAccess + ?Sized>(&self, access: &'c mut A) -> SchemaWalker<'c, A> {
        SchemaWalker::new(
            access,
            Arc::clone(&self.classifier),
            self.config.primary_key_marker.clone(),
        )
    }

    /// Recodes every selected table of the database, in catalog order.
    ///
    /// Table-level faults are recorded in `report` and processing moves on
    /// to the next table.
    ///
    /// # Errors
    /// Returns the first session-fatal fault (a lost connection) or a
    /// failure to list the tables.
    pub async fn recode_all<A: DatabaseAccess + ?Sized>(
        &self,
        access: &mut A,
        report: &mut SessionReport,
    ) -> Result<()> {
        let tables = self.walker(access).tables().await?;
        info!(
            "Recoding {} tables ({})",
            tables.len(),
            if self.is_dry_run() { "dry run" } else { "execute" }
        );

        for table in tables {
            if !self.config.includes_table(&table) {
                debug!("Table '{}' not selected, skipping", table);
                continue;
            }
            self.recode_table(access, &table, report).await?;
        }

        Ok(())
    }

    /// Recodes every text column of one table.
    ///
    /// The table's report is appended to `report` on every path, including
    /// aborted passes, so changes made before a fault stay auditable.
    ///
    /// # Errors
    /// Returns only session-fatal faults; everything else is recorded.
    pub async fn recode_table<A: DatabaseAccess + ?Sized>(
        &self,
        access: &mut A,
        table: &str,
        report: &mut SessionReport,
    ) -> Result<()> {
        let mut table_report = TableReport::new(table);
        let result = self.table_pass(access, table, &mut table_report).await;

        for change in &table_report.changes {
            let diagnostic = match &change.status {
                ChangeStatus::Failed { reason } => Diagnostic::RowWriteFailed {
                    table: table.to_string(),
                    column: change.column.clone(),
                    key: change.key_display(),
                    reason: reason.clone(),
                },
                ChangeStatus::Rejected { reason } => Diagnostic::UnreadableValue {
                    table: table.to_string(),
                    column: change.column.clone(),
                    key: change.key_display(),
                    reason: reason.clone(),
                },
                _ => continue,
            };
            report.diagnostics.push(diagnostic);
        }

        match result {
            Ok(()) => {
                if let TableOutcome::Skipped { .. } = table_report.outcome {
                    report.diagnostics.push(Diagnostic::MissingPrimaryKey {
                        table: table.to_string(),
                        columns: table_report.text_columns.clone(),
                    });
                }
                report.tables.push(table_report);
                Ok(())
            }
            Err(e) => {
                error!("Recoding of table '{}' aborted: {}", table, e);
                table_report.outcome = TableOutcome::Aborted {
                    reason: e.to_string(),
                };
                report.diagnostics.push(Diagnostic::TableAborted {
                    table: table.to_string(),
                    reason: e.to_string(),
                });
                report.tables.push(table_report);
                if e.is_session_fatal() { Err(e) } else { Ok(()) }
            }
        }
    }

    async fn table_pass<A: DatabaseAccess + ?Sized>(
        &self,
        access: &mut A,
        table: &str,
        table_report: &mut TableReport,
    ) -> Result<()> {
        let mut walker = self.walker(access);

        let mut text_columns = Vec::new();
        for column in walker.columns(table).await? {
            if column.is_text()? {
                text_columns.push(column.name().to_string());
            }
        }
        table_report.text_columns = text_columns;
        if table_report.text_columns.is_empty() {
            debug!("Table '{}' has no text columns", table);
            return Ok(());
        }

        let primary_key = walker.primary_keys(table).await?;
        if primary_key.is_empty() {
            warn!(
                "Table '{}' has no primary key, skipping text columns: {}",
                table,
                table_report.text_columns.join(", ")
            );
            table_report.outcome = TableOutcome::Skipped {
                reason: "no primary key".to_string(),
            };
            return Ok(());
        }
        table_report.primary_key = primary_key;

        for column in table_report.text_columns.clone() {
            info!("Recoding table {} column {}", table, column);
            self.column_pass(access, table, &column, table_report).await?;
        }

        Ok(())
    }

    async fn column_pass<A: DatabaseAccess + ?Sized>(
        &self,
        access: &mut A,
        table: &str,
        column: &str,
        table_report: &mut TableReport,
    ) -> Result<()> {
        let key_columns = &table_report.primary_key;
        let mut select = Vec::with_capacity(key_columns.len() + 1);
        select.push(column.to_string());
        select.extend(key_columns.iter().cloned());

        let rows = access.select_all(&select, table).await?;
        let correlations = rows
            .into_iter()
            .map(|row| RowCorrelation::from_row(table, key_columns, row))
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "Read {} rows of {}.{}",
            correlations.len(),
            table,
            column
        );

        for correlation in correlations {
            let change = self.recode_row(access, table, column, correlation).await?;
            table_report.changes.push(change);
        }

        Ok(())
    }

    async fn recode_row<A: DatabaseAccess + ?Sized>(
        &self,
        access: &mut A,
        table: &str,
        column: &str,
        correlation: RowCorrelation,
    ) -> Result<RowChange> {
        let RowCorrelation { value, key } = correlation;
        let mut change = RowChange {
            column: column.to_string(),
            key,
            old: value,
            new: Value::Null,
            status: ChangeStatus::Unchanged,
        };

        if change.old.is_null() {
            change.new = Value::Null;
            change.status = ChangeStatus::Skipped {
                reason: "NULL value".to_string(),
            };
            debug!(
                "Skipping {}.{} where {}: NULL",
                table,
                column,
                change.key_display()
            );
            return Ok(change);
        }
        let Some(old) = change.old.as_text() else {
            // A text column must yield strings; anything else means the
            // binding could not decode the cell
            change.new = change.old.clone();
            change.status = ChangeStatus::Rejected {
                reason: format!("value is not a string: {}", change.old),
            };
            warn!(
                "Not recoding {}.{} where {}: {}",
                table,
                column,
                change.key_display(),
                change.old
            );
            return Ok(change);
        };

        let new = self.transform.apply(old);
        if new == old {
            change.new = change.old.clone();
            return Ok(change);
        }
        change.new = Value::Text(new);

        if self.is_dry_run() {
            debug!(
                "[dry run] would update {}.{} where {}: {} -> {}",
                table,
                column,
                change.key_display(),
                change.old,
                change.new
            );
            change.status = ChangeStatus::Planned;
            return Ok(change);
        }

        let assignment = [(column.to_string(), change.new.clone())];
        match access.update(table, &assignment, &change.key).await {
            Ok(()) => {
                debug!(
                    "Updated {}.{} where {}",
                    table,
                    column,
                    change.key_display()
                );
                change.status = ChangeStatus::Updated;
                Ok(change)
            }
            Err(e) if e.is_session_fatal() => Err(e),
            Err(e) => {
                warn!(
                    "Update of {}.{} where {} failed: {}",
                    table,
                    column,
                    change.key_display(),
                    e
                );
                change.status = ChangeStatus::Failed {
                    reason: failure_reason(&e),
                };
                Ok(change)
            }
        }
    }
}

/// Error message including its source, for reports.
fn failure_reason(error: &RecodeError) -> String {
    match std::error::Error::source(error) {
        Some(source) => format!("{}: {}", error, source),
        None => error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{ConnectionSource, MemoryDatabase};
    use crate::models::RawColumn;

    fn people() -> MemoryDatabase {
        MemoryDatabase::new().with_table(
            "people",
            vec![
                RawColumn::new("id", "int(11)", "PRI"),
                RawColumn::new("city", "varchar(20)", ""),
            ],
            vec![
                vec![Value::Int(1), Value::from("Rome")],
                vec![Value::Int(2), Value::from("Milan")],
                vec![Value::Int(3), Value::Null],
                vec![Value::Int(4), Value::from("ada")],
            ],
        )
    }

    fn engine(dry_run: bool) -> RecodeEngine {
        RecodeEngine::new(
            RecodeConfig::default().with_dry_run(dry_run),
            Transform::reverse(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_writing() {
        let db = people();
        let mut conn = db.acquire().await.unwrap();
        let engine = engine(true);
        let mut report = engine.new_report();

        engine.recode_all(&mut conn, &mut report).await.unwrap();

        assert_eq!(report.planned_count(), 2);
        assert_eq!(db.update_count(), 0);
        assert_eq!(db.column_values("people", "city")[0], Value::from("Rome"));
    }

    #[tokio::test]
    async fn test_null_and_palindrome_rows_are_reported_not_written() {
        let db = people();
        let mut conn = db.acquire().await.unwrap();
        let engine = engine(false);
        let mut report = engine.new_report();

        engine.recode_all(&mut conn, &mut report).await.unwrap();

        let table = report.table("people").unwrap();
        assert_eq!(table.changes.len(), 4);
        assert!(matches!(
            table.changes[2].status,
            ChangeStatus::Skipped { .. }
        ));
        assert_eq!(table.changes[3].status, ChangeStatus::Unchanged);
        assert_eq!(db.update_count(), 2);
    }

    #[tokio::test]
    async fn test_non_string_text_cell_is_reported() {
        let db = MemoryDatabase::new().with_table(
            "people",
            vec![
                RawColumn::new("id", "int(11)", "PRI"),
                RawColumn::new("city", "varchar(20)", ""),
            ],
            vec![
                vec![Value::Int(1), Value::Bytes(b"Rome".to_vec())],
                vec![Value::Int(2), Value::from("Milan")],
            ],
        );
        let mut conn = db.acquire().await.unwrap();
        let engine = engine(false);
        let mut report = engine.new_report();

        engine.recode_all(&mut conn, &mut report).await.unwrap();

        let table = report.table("people").unwrap();
        assert!(table.changes[0].status.is_rejected());
        assert_eq!(table.changes[1].status, ChangeStatus::Updated);
        assert!(report.has_failures());
        assert!(matches!(
            &report.diagnostics[..],
            [Diagnostic::UnreadableValue { column, key, .. }] if column == "city" && key == "id=1"
        ));
        assert_eq!(
            db.column_values("people", "city")[0],
            Value::Bytes(b"Rome".to_vec())
        );
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let config = RecodeConfig::default().with_primary_key_marker("");
        assert!(RecodeEngine::new(config, Transform::identity()).is_err());
    }

    #[tokio::test]
    async fn test_table_selection_is_honored() {
        let db = people().with_table(
            "cities",
            vec![
                RawColumn::new("code", "char(3)", "PRI"),
                RawColumn::new("name", "varchar(40)", ""),
            ],
            vec![vec![Value::from("ROM"), Value::from("Roma")]],
        );
        let mut conn = db.acquire().await.unwrap();
        let engine = RecodeEngine::new(
            RecodeConfig::default().with_tables(vec!["cities".to_string()]),
            Transform::reverse(),
        )
        .unwrap();
        let mut report = engine.new_report();

        engine.recode_all(&mut conn, &mut report).await.unwrap();

        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].table, "cities");
        // Both the key and the name are text columns
        assert_eq!(report.tables[0].text_columns, vec!["code", "name"]);
    }

    #[test]
    fn test_failure_reason_includes_source() {
        let error = RecodeError::query_failed(
            "Failed to update",
            crate::error::Message("Duplicate entry".to_string()),
        );
        let reason = failure_reason(&error);
        assert!(reason.contains("Failed to update"));
        assert!(reason.contains("Duplicate entry"));
    }
}
