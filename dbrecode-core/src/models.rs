//! Core data models for schema traversal and row correlation.
//!
//! `ColumnDescriptor` is the immutable per-column record produced by the
//! schema walker; `RowCorrelation` pairs a fetched text value with the
//! primary-key values of the same row.

use crate::classifier::TypeClassifier;
use crate::{Result, error::RecodeError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

/// Primary-key marker reported by MySQL in `COLUMN_KEY`.
pub const MYSQL_PRIMARY_KEY_MARKER: &str = "PRI";

/// A single cell value as read from or written to the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Returns the text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "'{}'", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

/// Column metadata exactly as the schema catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    /// Column name
    pub name: String,
    /// Type including any size suffix, e.g. `varchar(20)`
    pub raw_type: String,
    /// Raw key flag, e.g. `PRI`, `UNI`, `MUL` or empty
    pub key_flag: String,
}

impl RawColumn {
    /// Creates a raw column record.
    pub fn new(
        name: impl Into<String>,
        raw_type: impl Into<String>,
        key_flag: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            raw_type: raw_type.into(),
            key_flag: key_flag.into(),
        }
    }
}

/// Strips a parenthesized size suffix: `varchar(20)` becomes `varchar`.
///
/// Everything from the first `(` on is dropped; a type without `(` is
/// returned unchanged.
pub fn normalize_type(raw_type: &str) -> &str {
    raw_type
        .split_once('(')
        .map_or(raw_type, |(prefix, _)| prefix)
}

/// Immutable description of one table column.
///
/// Text-ness is classified lazily on first request and cached for the
/// lifetime of the descriptor.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    name: String,
    raw_type: String,
    normalized_type: String,
    is_primary_key: bool,
    classifier: Arc<TypeClassifier>,
    text: OnceLock<bool>,
}

impl ColumnDescriptor {
    /// Builds a descriptor from catalog metadata.
    ///
    /// `primary_key_marker` is the key flag value that marks a primary-key
    /// column in the catalog in use (`PRI` for MySQL); any other value means
    /// the column is not part of the primary key.
    pub fn new(raw: RawColumn, primary_key_marker: &str, classifier: Arc<TypeClassifier>) -> Self {
        let normalized_type = normalize_type(&raw.raw_type).to_string();
        Self {
            is_primary_key: raw.key_flag == primary_key_marker,
            name: raw.name,
            raw_type: raw.raw_type,
            normalized_type,
            classifier,
            text: OnceLock::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw_type(&self) -> &str {
        &self.raw_type
    }

    pub fn normalized_type(&self) -> &str {
        &self.normalized_type
    }

    pub fn is_primary_key(&self) -> bool {
        self.is_primary_key
    }

    /// Whether the column holds re-encodable text.
    ///
    /// # Errors
    /// Returns `RecodeError::UnknownType` naming this column when its
    /// normalized type has no classification. Failures are not cached.
    pub fn is_text(&self) -> Result<bool> {
        if let Some(text) = self.text.get() {
            return Ok(*text);
        }
        let text = self
            .classifier
            .lookup(&self.normalized_type)
            .ok_or_else(|| RecodeError::unknown_type(&self.name, &self.normalized_type))?;
        Ok(*self.text.get_or_init(|| text))
    }
}

impl PartialEq for ColumnDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.raw_type == other.raw_type
            && self.is_primary_key == other.is_primary_key
    }
}

impl std::fmt::Display for ColumnDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if self.is_primary_key {
            write!(f, "*")?;
        }
        write!(f, " {}", self.normalized_type)
    }
}

/// A text value paired with the primary-key identity of its row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowCorrelation {
    /// The fetched text-column value
    pub value: Value,
    /// Primary-key column names paired with this row's values, in key order
    pub key: Vec<(String, Value)>,
}

impl RowCorrelation {
    /// Splits a fetched row `[value, k1, k2, ...]` and pairs the key values
    /// positionally with `key_columns`.
    ///
    /// # Errors
    /// Returns `RecodeError::CorrelationMismatch` when the row does not carry
    /// exactly one value per key column. Rows are never truncated or padded.
    pub fn from_row(table: &str, key_columns: &[String], row: Vec<Value>) -> Result<Self> {
        let mut cells = row.into_iter();
        let Some(value) = cells.next() else {
            return Err(RecodeError::CorrelationMismatch {
                table: table.to_string(),
                expected: key_columns.len(),
                actual: 0,
            });
        };
        let key_values: Vec<Value> = cells.collect();
        if key_values.len() != key_columns.len() {
            return Err(RecodeError::CorrelationMismatch {
                table: table.to_string(),
                expected: key_columns.len(),
                actual: key_values.len(),
            });
        }
        Ok(Self {
            value,
            key: key_columns.iter().cloned().zip(key_values).collect(),
        })
    }

    /// Renders the key as `k1=v1, k2=v2` for logs.
    pub fn key_display(&self) -> String {
        format_key(&self.key)
    }
}

/// Renders primary-key pairs as `k1=v1, k2=v2`.
pub fn format_key(key: &[(String, Value)]) -> String {
    key.iter()
        .map(|(column, value)| format!("{}={}", column, value))
        .collect::<Vec<_>>()
        .join(", ")
}
