//! MySQL implementation of the database access traits.
//!
//! # Module Structure
//! - `connection`: Connection string parsing and pool creation
//! - `access`: Metadata, read, and keyed-update statements
//!
//! # Security Guarantees
//! - Connection strings are sanitized in error messages
//! - Identifiers are backtick-quoted; values are always bound parameters
//! - Query timeouts prevent runaway statements

pub mod access;
pub mod connection;

#[cfg(test)]
mod tests;

pub use access::MySqlConnection;
pub use connection::{parse_mysql_connection_config, validate_mysql_connection_string};

use super::{ConnectionConfig, ConnectionSource};
use crate::Result;
use crate::error::RecodeError;
use async_trait::async_trait;
use sqlx::MySqlPool;

/// Pool-backed connection source for MySQL.
///
/// Each recode session acquires one pooled connection and keeps it for the
/// whole run; releasing it returns it to the pool.
pub struct MySqlSource {
    /// Connection pool for database operations
    pub pool: MySqlPool,
    /// Connection configuration (pool settings, timeouts, etc.)
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for MySqlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlSource")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish_non_exhaustive()
    }
}

impl MySqlSource {
    /// Creates a source from a `mysql://` URL.
    ///
    /// The pool connects lazily; the first `acquire` or `test_connection`
    /// reaches the server.
    ///
    /// # Errors
    /// Returns a configuration error if the URL is malformed or names no
    /// database.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = parse_mysql_connection_config(connection_string)?;
        Self::with_config(connection_string, config).await
    }

    /// Creates a source with an explicit pool configuration.
    ///
    /// # Errors
    /// Returns a configuration error if `config` or the URL is invalid.
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        validate_mysql_connection_string(connection_string)?;

        let pool = connection::create_mysql_connection_pool(connection_string, &config)?;
        tracing::debug!("Created MySQL source for {}", config);

        Ok(Self { pool, config })
    }

    /// Checks connectivity and access to `INFORMATION_SCHEMA`.
    ///
    /// # Errors
    /// Returns a connection error if the server is unreachable and a query
    /// error if the catalog cannot be read.
    pub async fn test_connection(&self) -> Result<()> {
        let connectivity_result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RecodeError::connection_failed("Connectivity check failed", e))?;

        if connectivity_result != 1 {
            return Err(RecodeError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }

        let visible_tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_SCHEMA = DATABASE()",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| access::classify_error("Cannot access INFORMATION_SCHEMA", e))?;

        tracing::info!(
            "Connection to {} verified, {} tables visible",
            self.config,
            visible_tables
        );
        Ok(())
    }

    /// Closes the pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ConnectionSource for MySqlSource {
    type Connection = MySqlConnection;

    async fn acquire(&self) -> Result<MySqlConnection> {
        let conn = self.pool.acquire().await.map_err(|e| {
            RecodeError::connection_failed(
                format!("Failed to acquire connection to {}", self.config),
                e,
            )
        })?;
        tracing::debug!("Acquired connection to {}", self.config);
        Ok(MySqlConnection::new(conn))
    }

    async fn release(&self, connection: MySqlConnection) -> Result<()> {
        // Dropping a pooled connection hands it back to the pool
        drop(connection);
        tracing::debug!("Released connection to {}", self.config);
        Ok(())
    }
}
