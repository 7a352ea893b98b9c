//! In-memory database with fault injection.
//!
//! `MemoryDatabase` implements both `ConnectionSource` and, through
//! `MemoryConnection`, `DatabaseAccess`. Tables are stored in insertion order
//! with MySQL-style column metadata. Faults can be injected per table or per
//! row to exercise every error path of a recode session without a server.
//!
//! # Example
//! ```rust
//! use dbrecode_core::adapters::MemoryDatabase;
//! use dbrecode_core::models::{RawColumn, Value};
//!
//! let db = MemoryDatabase::new().with_table(
//!     "people",
//!     vec![RawColumn::new("id", "int(11)", "PRI"), RawColumn::new("city", "varchar(20)", "")],
//!     vec![vec![Value::Int(1), Value::from("Rome")]],
//! );
//! assert_eq!(db.column_values("people", "city"), vec![Value::from("Rome")]);
//! ```

use super::{ConnectionSource, DatabaseAccess};
use crate::error::{Message, RecodeError};
use crate::models::{RawColumn, Value, format_key};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct MemoryTable {
    name: String,
    columns: Vec<RawColumn>,
    rows: Vec<Vec<Value>>,
}

impl MemoryTable {
    fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column)
    }
}

#[derive(Debug, Default)]
struct Faults {
    failing_reads: HashSet<String>,
    failing_updates: Vec<(String, Vec<(String, Value)>)>,
    short_rows: HashSet<String>,
    lose_connection_after: Option<usize>,
    fail_acquire: bool,
    fail_release: bool,
}

#[derive(Debug, Default)]
struct State {
    tables: Vec<MemoryTable>,
    faults: Faults,
    connection_lost: bool,
    acquired: usize,
    released: usize,
    updates: usize,
}

impl State {
    fn table(&self, name: &str) -> Result<&MemoryTable> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| missing_table(name))
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connection_lost {
            return Err(RecodeError::connection_failed(
                "In-memory connection lost",
                Message("connection reset".to_string()),
            ));
        }
        Ok(())
    }
}

fn short_row(table: &str, position: usize, cells: usize, columns: usize) -> RecodeError {
    RecodeError::query_failed(
        format!("Failed to read table '{}'", table),
        Message(format!(
            "row {} has {} cells but the table has {} columns",
            position, cells, columns
        )),
    )
}

fn missing_table(name: &str) -> RecodeError {
    RecodeError::query_failed(
        format!("Table '{}' does not exist", name),
        Message(format!("no such table: {}", name)),
    )
}

/// Shared in-memory database.
///
/// Clones share the same underlying state, so a test can keep one handle
/// for inspection while a session works through another.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<State>>,
}

impl MemoryDatabase {
    /// Creates an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a table. Each row holds one value per column, in column order.
    pub fn with_table(
        self,
        name: impl Into<String>,
        columns: Vec<RawColumn>,
        rows: Vec<Vec<Value>>,
    ) -> Self {
        self.lock().tables.push(MemoryTable {
            name: name.into(),
            columns,
            rows,
        });
        self
    }

    /// Snapshot of every row of `table`, or `None` if it does not exist.
    pub fn rows(&self, table: &str) -> Option<Vec<Vec<Value>>> {
        self.lock().table(table).ok().map(|t| t.rows.clone())
    }

    /// Values of one column across all rows, in row order.
    pub fn column_values(&self, table: &str, column: &str) -> Vec<Value> {
        let state = self.lock();
        let Ok(table) = state.table(table) else {
            return Vec::new();
        };
        let Some(index) = table.column_index(column) else {
            return Vec::new();
        };
        table
            .rows
            .iter()
            .map(|row| row.get(index).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Makes every bulk read of `table` fail with a query error.
    pub fn fail_reads(&self, table: impl Into<String>) {
        self.lock().faults.failing_reads.insert(table.into());
    }

    /// Makes updates of `table` fail when the where clause contains every
    /// pair of `key`.
    pub fn fail_update(&self, table: impl Into<String>, key: Vec<(String, Value)>) {
        self.lock().faults.failing_updates.push((table.into(), key));
    }

    /// Makes bulk reads of `table` drop the last cell of every row.
    pub fn truncate_rows(&self, table: impl Into<String>) {
        self.lock().faults.short_rows.insert(table.into());
    }

    /// Drops the connection once `updates` successful updates have run.
    pub fn lose_connection_after(&self, updates: usize) {
        self.lock().faults.lose_connection_after = Some(updates);
    }

    /// Makes `acquire` fail.
    pub fn fail_acquire(&self) {
        self.lock().faults.fail_acquire = true;
    }

    /// Makes `release` fail (the release is still counted).
    pub fn fail_release(&self) {
        self.lock().faults.fail_release = true;
    }

    /// Number of successful acquisitions.
    pub fn acquire_count(&self) -> usize {
        self.lock().acquired
    }

    /// Number of release attempts.
    pub fn release_count(&self) -> usize {
        self.lock().released
    }

    /// Number of successful updates.
    pub fn update_count(&self) -> usize {
        self.lock().updates
    }
}

#[async_trait]
impl ConnectionSource for MemoryDatabase {
    type Connection = MemoryConnection;

    async fn acquire(&self) -> Result<MemoryConnection> {
        let mut state = self.lock();
        if state.faults.fail_acquire {
            return Err(RecodeError::connection_failed(
                "Failed to acquire in-memory connection",
                Message("acquire refused".to_string()),
            ));
        }
        state.acquired += 1;
        Ok(MemoryConnection {
            database: self.clone(),
        })
    }

    async fn release(&self, _connection: MemoryConnection) -> Result<()> {
        let mut state = self.lock();
        state.released += 1;
        if state.faults.fail_release {
            return Err(RecodeError::connection_failed(
                "Failed to release in-memory connection",
                Message("release refused".to_string()),
            ));
        }
        Ok(())
    }
}

/// Connection handed out by `MemoryDatabase`.
#[derive(Debug)]
pub struct MemoryConnection {
    database: MemoryDatabase,
}

#[async_trait]
impl DatabaseAccess for MemoryConnection {
    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let state = self.database.lock();
        state.ensure_connected()?;
        Ok(state.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn list_columns(&mut self, table: &str) -> Result<Vec<RawColumn>> {
        let state = self.database.lock();
        state.ensure_connected()?;
        Ok(state.table(table)?.columns.clone())
    }

    async fn select_all(&mut self, columns: &[String], table: &str) -> Result<Vec<Vec<Value>>> {
        let state = self.database.lock();
        state.ensure_connected()?;
        if state.faults.failing_reads.contains(table) {
            return Err(RecodeError::query_failed(
                format!("Failed to read table '{}'", table),
                Message("injected read fault".to_string()),
            ));
        }
        let data = state.table(table)?;
        let indexes = columns
            .iter()
            .map(|column| {
                data.column_index(column).ok_or_else(|| {
                    RecodeError::query_failed(
                        format!("Unknown column '{}' in table '{}'", column, table),
                        Message(format!("no such column: {}", column)),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let truncate = state.faults.short_rows.contains(table);
        data.rows
            .iter()
            .enumerate()
            .map(|(position, row)| -> Result<Vec<Value>> {
                let mut cells = indexes
                    .iter()
                    .map(|&i| {
                        row.get(i)
                            .cloned()
                            .ok_or_else(|| short_row(table, position, row.len(), data.columns.len()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                if truncate {
                    cells.pop();
                }
                Ok(cells)
            })
            .collect()
    }

    async fn update(
        &mut self,
        table: &str,
        assignments: &[(String, Value)],
        where_equals: &[(String, Value)],
    ) -> Result<()> {
        let mut state = self.database.lock();
        state.ensure_connected()?;
        if where_equals.is_empty() {
            return Err(RecodeError::configuration(format!(
                "update of '{}' has no key condition",
                table
            )));
        }

        let injected = state.faults.failing_updates.iter().any(|(t, key)| {
            t == table && key.iter().all(|pair| where_equals.contains(pair))
        });
        if injected {
            return Err(RecodeError::query_failed(
                format!("Failed to update table '{}'", table),
                Message("injected constraint violation".to_string()),
            ));
        }

        let index = state
            .tables
            .iter()
            .position(|t| t.name == table)
            .ok_or_else(|| missing_table(table))?;
        let data = &mut state.tables[index];

        let resolve = |pairs: &[(String, Value)]| -> Result<Vec<(usize, Value)>> {
            pairs
                .iter()
                .map(|(column, value)| {
                    data.column_index(column)
                        .map(|i| (i, value.clone()))
                        .ok_or_else(|| {
                            RecodeError::query_failed(
                                format!("Unknown column '{}' in table '{}'", column, table),
                                Message(format!("no such column: {}", column)),
                            )
                        })
                })
                .collect()
        };
        let sets = resolve(assignments)?;
        let filters = resolve(where_equals)?;

        let width = data.columns.len();
        let mut matched = 0;
        for (position, row) in data.rows.iter_mut().enumerate() {
            if !filters.iter().all(|(i, v)| row.get(*i) == Some(v)) {
                continue;
            }
            if row.len() < width {
                return Err(short_row(table, position, row.len(), width));
            }
            for (i, value) in &sets {
                if let Some(cell) = row.get_mut(*i) {
                    *cell = value.clone();
                }
            }
            matched += 1;
        }
        if matched == 0 {
            return Err(RecodeError::query_failed(
                format!("Failed to update table '{}'", table),
                Message(format!("no row matches {}", format_key(where_equals))),
            ));
        }

        state.updates += 1;
        if let Some(limit) = state.faults.lose_connection_after
            && state.updates >= limit
        {
            state.connection_lost = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            ],
        )
    }

    #[tokio::test]
    async fn test_select_all_orders_requested_columns() {
        let db = people();
        let mut conn = db.acquire().await.unwrap();
        let rows = conn
            .select_all(&["city".to_string(), "id".to_string()], "people")
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Value::from("Rome"), Value::Int(1)],
                vec![Value::from("Milan"), Value::Int(2)],
            ]
        );
    }

    #[tokio::test]
    async fn test_update_matches_where_clause() {
        let db = people();
        let mut conn = db.acquire().await.unwrap();
        conn.update(
            "people",
            &[("city".to_string(), Value::from("Turin"))],
            &[("id".to_string(), Value::Int(2))],
        )
        .await
        .unwrap();

        assert_eq!(
            db.column_values("people", "city"),
            vec![Value::from("Rome"), Value::from("Turin")]
        );
        assert_eq!(db.update_count(), 1);
    }

    #[tokio::test]
    async fn test_update_without_matching_row_fails() {
        let db = people();
        let mut conn = db.acquire().await.unwrap();
        let err = conn
            .update(
                "people",
                &[("city".to_string(), Value::from("Turin"))],
                &[("id".to_string(), Value::Int(9))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecodeError::Query { .. }));
        assert_eq!(db.update_count(), 0);
    }

    #[tokio::test]
    async fn test_short_row_is_an_error_not_a_panic() {
        let db = MemoryDatabase::new().with_table(
            "people",
            vec![
                RawColumn::new("id", "int(11)", "PRI"),
                RawColumn::new("city", "varchar(20)", ""),
            ],
            vec![vec![Value::Int(1), Value::from("Rome")], vec![Value::Int(2)]],
        );
        let mut conn = db.acquire().await.unwrap();

        let err = conn
            .select_all(&["city".to_string(), "id".to_string()], "people")
            .await
            .unwrap_err();
        assert!(matches!(err, RecodeError::Query { .. }));

        let err = conn
            .update(
                "people",
                &[("city".to_string(), Value::from("Turin"))],
                &[("id".to_string(), Value::Int(2))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecodeError::Query { .. }));
        assert_eq!(
            db.column_values("people", "city"),
            vec![Value::from("Rome"), Value::Null]
        );
    }

    #[tokio::test]
    async fn test_unknown_table_is_query_error() {
        let db = people();
        let mut conn = db.acquire().await.unwrap();
        let err = conn.list_columns("nope").await.unwrap_err();
        assert!(matches!(err, RecodeError::Query { .. }));
    }

    #[tokio::test]
    async fn test_injected_update_fault() {
        let db = people();
        db.fail_update("people", vec![("id".to_string(), Value::Int(1))]);
        let mut conn = db.acquire().await.unwrap();

        let err = conn
            .update(
                "people",
                &[("city".to_string(), Value::from("x"))],
                &[("id".to_string(), Value::Int(1))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RecodeError::Query { .. }));
        assert_eq!(db.column_values("people", "city")[0], Value::from("Rome"));
    }

    #[tokio::test]
    async fn test_lost_connection_fails_everything() {
        let db = people();
        db.lose_connection_after(1);
        let mut conn = db.acquire().await.unwrap();
        conn.update(
            "people",
            &[("city".to_string(), Value::from("x"))],
            &[("id".to_string(), Value::Int(1))],
        )
        .await
        .unwrap();

        let err = conn.list_tables().await.unwrap_err();
        assert!(err.is_session_fatal());
    }

    #[tokio::test]
    async fn test_acquire_and_release_are_counted() {
        let db = people();
        let conn = db.acquire().await.unwrap();
        db.release(conn).await.unwrap();
        assert_eq!(db.acquire_count(), 1);
        assert_eq!(db.release_count(), 1);
    }
}
