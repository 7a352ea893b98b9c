//! MySQL connection string parsing and pool creation.
//!
//! # Security Features
//! - Validates connection string format and parameters
//! - Enforces connection limits to prevent resource exhaustion
//! - Sets appropriate timeouts for all operations

use crate::adapters::config::{ConnectionConfig, MAX_POOL_CONNECTIONS};
use crate::Result;
use crate::error::{RecodeError, redact_database_url};
use sqlx::MySqlPool;
use std::time::Duration;
use url::Url;

/// Parses a MySQL connection string into a connection configuration.
///
/// Recognizes the `connect_timeout`, `query_timeout` (seconds) and
/// `pool_max_conns` query parameters; others are left for the driver.
///
/// # Errors
/// Returns a configuration error if the URL is malformed, names no
/// database, or carries out-of-range values.
pub fn parse_mysql_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
    validate_mysql_connection_string(connection_string)?;

    let url = Url::parse(connection_string).map_err(|e| {
        RecodeError::configuration(format!("Invalid MySQL connection string format: {}", e))
    })?;

    let host = url.host_str().unwrap_or("localhost");
    let port = url.port().unwrap_or(3306);
    if port == 0 {
        return Err(RecodeError::configuration(
            "Invalid port number: must be greater than 0",
        ));
    }

    let database = url.path().trim_start_matches('/');
    if database.len() > 64 {
        return Err(RecodeError::configuration(
            "Database name too long: maximum 64 characters",
        ));
    }

    let mut config = ConnectionConfig::new(format!("{}:{}/{}", host, port, database));

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "connect_timeout" => {
                if let Ok(timeout_secs) = value.parse::<u64>()
                    && timeout_secs > 0
                    && timeout_secs <= 300
                {
                    config.connect_timeout = Duration::from_secs(timeout_secs);
                }
            }
            "query_timeout" => {
                if let Ok(timeout_secs) = value.parse::<u64>()
                    && timeout_secs > 0
                    && timeout_secs <= 3600
                {
                    config.query_timeout = Duration::from_secs(timeout_secs);
                }
            }
            "pool_max_conns" => {
                if let Ok(max_conns) = value.parse::<u32>()
                    && max_conns > 0
                    && max_conns <= MAX_POOL_CONNECTIONS
                {
                    config.max_connections = max_conns;
                }
            }
            _ => {}
        }
    }

    config.validate()?;
    Ok(config)
}

/// Validates MySQL connection string format.
///
/// A database name is required: recoding always runs against the tables of
/// one active database.
///
/// # Errors
/// Returns a configuration error if the connection string is unusable.
pub fn validate_mysql_connection_string(connection_string: &str) -> Result<()> {
    let url = Url::parse(connection_string).map_err(|e| {
        RecodeError::configuration(format!("Invalid MySQL connection string format: {}", e))
    })?;

    if url.scheme() != "mysql" {
        return Err(RecodeError::configuration(
            "Connection string must use mysql:// scheme",
        ));
    }

    if url.host_str().is_none() {
        return Err(RecodeError::configuration(
            "Connection string must specify a host",
        ));
    }

    if url.path().trim_start_matches('/').is_empty() {
        return Err(RecodeError::configuration(
            "Connection string must name a database",
        ));
    }

    Ok(())
}

/// Creates a lazily connecting MySQL pool.
pub(super) fn create_mysql_connection_pool(
    connection_string: &str,
    config: &ConnectionConfig,
) -> Result<MySqlPool> {
    use sqlx::Executor;

    let query_timeout_ms = config.query_timeout.as_millis();

    sqlx::mysql::MySqlPoolOptions::new()
        .max_connections(config.max_connections.min(MAX_POOL_CONNECTIONS))
        .acquire_timeout(config.connect_timeout)
        .test_before_acquire(true)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                conn.execute(format!("SET max_execution_time = {}", query_timeout_ms).as_str())
                    .await?;
                conn.execute("SET time_zone = '+00:00'").await?;
                Ok(())
            })
        })
        .connect_lazy(connection_string)
        .map_err(|e| {
            RecodeError::connection_failed(
                format!(
                    "Failed to create MySQL connection pool to {}",
                    redact_database_url(connection_string)
                ),
                e,
            )
        })
}
