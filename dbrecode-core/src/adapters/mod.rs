//! Database access traits and their implementations.
//!
//! The recode engine never talks to a driver directly. It consumes two
//! traits: `ConnectionSource`, which hands out one exclusive connection per
//! session and takes it back afterwards, and `DatabaseAccess`, the handful of
//! metadata, read, and write operations a recode pass needs.
//!
//! # Module Structure
//! - `config`: Connection and recode configuration types
//! - `memory`: In-memory implementation with fault injection
//! - `mysql`: MySQL implementation over a sqlx pool (feature `mysql`)

use crate::Result;
use crate::models::{RawColumn, Value};
use async_trait::async_trait;

pub mod config;
pub mod memory;

#[cfg(feature = "mysql")]
pub mod mysql;

pub use config::{ConnectionConfig, RecodeConfig};
pub use memory::{MemoryConnection, MemoryDatabase};

/// Operations the engine performs against one acquired connection.
///
/// Methods take `&mut self`: a connection serves a single session and is
/// never shared between concurrent callers.
///
/// # Errors
/// Implementations report a lost or unusable connection as
/// `RecodeError::Connection` and every other statement failure as
/// `RecodeError::Query`. The engine relies on that split to decide whether a
/// fault ends the row, the table, or the session.
#[async_trait]
pub trait DatabaseAccess: Send {
    /// Lists the base tables of the active database.
    async fn list_tables(&mut self) -> Result<Vec<String>>;

    /// Lists the columns of `table` in ordinal order.
    async fn list_columns(&mut self, table: &str) -> Result<Vec<RawColumn>>;

    /// Reads every row of `table`, returning the cells of `columns` in the
    /// requested order. Cells of character columns come back as
    /// `Value::Text` whatever their collation.
    async fn select_all(&mut self, columns: &[String], table: &str) -> Result<Vec<Vec<Value>>>;

    /// Updates the rows of `table` matching every `where_equals` pair.
    ///
    /// Fails with a query error when no row matches.
    async fn update(
        &mut self,
        table: &str,
        assignments: &[(String, Value)],
        where_equals: &[(String, Value)],
    ) -> Result<()>;
}

/// Hands out connections for recode sessions.
///
/// `release` is called exactly once for every successful `acquire`, on every
/// exit path of the session.
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    /// Connection type produced by this source
    type Connection: DatabaseAccess;

    /// Acquires a connection for exclusive use by one session.
    async fn acquire(&self) -> Result<Self::Connection>;

    /// Returns a connection to its owner, or closes it if standalone.
    async fn release(&self, connection: Self::Connection) -> Result<()>;
}

/// Quotes a MySQL identifier with backticks, doubling embedded backticks.
///
/// # Example
/// ```rust
/// use dbrecode_core::adapters::quote_identifier;
///
/// assert_eq!(quote_identifier("people"), "`people`");
/// assert_eq!(quote_identifier("we`ird"), "`we``ird`");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
