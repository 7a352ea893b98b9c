//! Metadata, read, and keyed-update statements over one pooled connection.
//!
//! Metadata comes from `INFORMATION_SCHEMA` for the active database
//! (`DATABASE()`). Name columns are cast to CHAR to avoid VARBINARY decoding
//! issues on MySQL 8.0+.

use crate::Result;
use crate::adapters::{DatabaseAccess, quote_identifier};
use crate::error::{Message, RecodeError};
use crate::models::{RawColumn, Value, format_key};
use async_trait::async_trait;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo};

/// One exclusively held pooled MySQL connection.
pub struct MySqlConnection {
    conn: PoolConnection<MySql>,
}

impl std::fmt::Debug for MySqlConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlConnection").finish_non_exhaustive()
    }
}

impl MySqlConnection {
    pub(super) fn new(conn: PoolConnection<MySql>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl DatabaseAccess for MySqlConnection {
    async fn list_tables(&mut self) -> Result<Vec<String>> {
        let query = r#"
            SELECT CAST(TABLE_NAME AS CHAR) as TABLE_NAME
            FROM INFORMATION_SCHEMA.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
        "#;

        let rows = sqlx::query(query)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| classify_error("Failed to enumerate tables", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("TABLE_NAME")
                    .map_err(|e| classify_error("Failed to read table name", e))
            })
            .collect()
    }

    async fn list_columns(&mut self, table: &str) -> Result<Vec<RawColumn>> {
        let query = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) as COLUMN_NAME,
                CAST(COLUMN_TYPE AS CHAR) as COLUMN_TYPE,
                CAST(COLUMN_KEY AS CHAR) as COLUMN_KEY
            FROM INFORMATION_SCHEMA.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query(query)
            .bind(table)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| {
                classify_error(format!("Failed to enumerate columns of '{}'", table), e)
            })?;

        if rows.is_empty() {
            return Err(RecodeError::query_failed(
                format!("Failed to enumerate columns of '{}'", table),
                Message(format!("table '{}' does not exist", table)),
            ));
        }

        rows.iter()
            .map(|row| {
                let read = |name: &str| -> Result<String> {
                    row.try_get::<Option<String>, _>(name)
                        .map(Option::unwrap_or_default)
                        .map_err(|e| {
                            classify_error(format!("Failed to read column metadata of '{}'", table), e)
                        })
                };
                Ok(RawColumn::new(
                    read("COLUMN_NAME")?,
                    read("COLUMN_TYPE")?,
                    read("COLUMN_KEY")?,
                ))
            })
            .collect()
    }

    async fn select_all(&mut self, columns: &[String], table: &str) -> Result<Vec<Vec<Value>>> {
        let sql = select_statement(columns, table);
        tracing::trace!("{}", sql);

        let rows = sqlx::query(&sql)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| classify_error(format!("Failed to read table '{}'", table), e))?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|index| extract_value(row, index, table))
                    .collect()
            })
            .collect()
    }

    async fn update(
        &mut self,
        table: &str,
        assignments: &[(String, Value)],
        where_equals: &[(String, Value)],
    ) -> Result<()> {
        let sql = update_statement(table, assignments, where_equals)?;
        tracing::trace!("{}", sql);

        let mut query = sqlx::query(&sql);
        for (_, value) in assignments.iter().chain(where_equals) {
            query = bind_value(query, value);
        }

        let result = query
            .execute(&mut *self.conn)
            .await
            .map_err(|e| classify_error(format!("Failed to update table '{}'", table), e))?;

        // The client sets CLIENT_FOUND_ROWS, so zero means no row matched
        // the key rather than an unchanged value.
        if result.rows_affected() == 0 {
            return Err(RecodeError::query_failed(
                format!("Failed to update table '{}'", table),
                Message(format!("no row matches {}", format_key(where_equals))),
            ));
        }
        Ok(())
    }
}

/// Builds `SELECT c1, c2, ... FROM t` with quoted identifiers.
pub fn select_statement(columns: &[String], table: &str) -> String {
    let columns = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    format!("SELECT {} FROM {}", columns, quote_identifier(table))
}

/// Builds `UPDATE t SET a = ? WHERE k1 = ? AND k2 = ?` with quoted
/// identifiers. Placeholders follow assignment order, then key order.
///
/// # Errors
/// Refuses statements without assignments or without a key condition.
pub fn update_statement(
    table: &str,
    assignments: &[(String, Value)],
    where_equals: &[(String, Value)],
) -> Result<String> {
    if assignments.is_empty() {
        return Err(RecodeError::configuration(format!(
            "update of '{}' has no assignments",
            table
        )));
    }
    if where_equals.is_empty() {
        return Err(RecodeError::configuration(format!(
            "update of '{}' has no key condition",
            table
        )));
    }

    let set = assignments
        .iter()
        .map(|(c, _)| format!("{} = ?", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let condition = where_equals
        .iter()
        .map(|(c, _)| format!("{} = ?", quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(" AND ");

    Ok(format!(
        "UPDATE {} SET {} WHERE {}",
        quote_identifier(table),
        set,
        condition
    ))
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Int(v) => query.bind(*v),
        Value::UInt(v) => query.bind(*v),
        Value::Float(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
        Value::Bytes(v) => query.bind(v.clone()),
    }
}

/// Driver type names whose cells are read as text regardless of collation.
///
/// Columns with a `_bin` collation carry the BINARY flag and are reported as
/// `VARBINARY`, `BLOB` and so on, which the checked `String` decoding
/// refuses. DECIMAL arrives as its canonical text and has no other decoding.
const TEXT_LIKE_TYPES: &[&str] = &[
    "CHAR",
    "VARCHAR",
    "TINYTEXT",
    "TEXT",
    "MEDIUMTEXT",
    "LONGTEXT",
    "BINARY",
    "VARBINARY",
    "TINYBLOB",
    "BLOB",
    "MEDIUMBLOB",
    "LONGBLOB",
    "ENUM",
    "SET",
    "DECIMAL",
];

/// Reads one cell, trying decodings in order of likelihood.
///
/// Temporal values are carried as their canonical text so they can be bound
/// back into a key condition. Byte strings that are valid UTF-8 come back as
/// text; anything else stays `Value::Bytes`.
fn extract_value(row: &MySqlRow, index: usize, table: &str) -> Result<Value> {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Text));
    }
    let type_name = row
        .try_column(index)
        .map(|c| c.type_info().name().to_string())
        .map_err(|e| {
            classify_error(
                format!("Failed to read column {} of table '{}'", index, table),
                e,
            )
        })?;
    if is_text_like(&type_name)
        && let Ok(v) = row.try_get_unchecked::<Option<String>, _>(index)
    {
        return Ok(v.map_or(Value::Null, Value::Text));
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Int));
    }
    if let Ok(v) = row.try_get::<Option<u64>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::UInt));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return Ok(v.map_or(Value::Null, Value::Float));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return Ok(v.map_or(Value::Null, |d| {
            Value::Text(d.format("%Y-%m-%d %H:%M:%S%.f").to_string())
        }));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
        return Ok(v.map_or(Value::Null, |d| Value::Text(d.to_string())));
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveTime>, _>(index) {
        return Ok(v.map_or(Value::Null, |t| Value::Text(t.to_string())));
    }

    row.try_get::<Option<Vec<u8>>, _>(index)
        .map(|v| v.map_or(Value::Null, Value::Bytes))
        .map_err(|e| {
            classify_error(
                format!(
                    "Unsupported {} value in column {} of table '{}'",
                    type_name, index, table
                ),
                e,
            )
        })
}

/// Whether cells of the driver type `type_name` are decoded as text.
pub fn is_text_like(type_name: &str) -> bool {
    TEXT_LIKE_TYPES.contains(&type_name)
}

/// Maps a driver error to the session-fatal or statement-level variant.
pub(crate) fn classify_error(context: impl Into<String>, error: sqlx::Error) -> RecodeError {
    if is_connection_error(&error) {
        RecodeError::connection_failed(context, error)
    } else {
        RecodeError::query_failed(context, error)
    }
}

/// Whether a driver error means the connection itself is unusable.
pub fn is_connection_error(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}
