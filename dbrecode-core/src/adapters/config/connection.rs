//! Pool settings for a connection source.

use crate::Result;
use crate::error::RecodeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on pooled connections. A session only ever holds one.
pub const MAX_POOL_CONNECTIONS: u32 = 100;

/// How a connection source reaches its server.
///
/// Holds the pool limits and timeouts plus a display-safe description of
/// the server (`host:port/database`). Credentials never enter this struct;
/// they stay in the connection URL handed to the driver.
///
/// # Example
/// ```rust
/// use dbrecode_core::adapters::ConnectionConfig;
/// use std::time::Duration;
///
/// let config = ConnectionConfig::new("db.internal:3306/shop")
///     .with_query_timeout(Duration::from_secs(120))
///     .with_max_connections(4);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.to_string(), "db.internal:3306/shop");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// `host:port/database`, used in logs and error messages
    pub target: String,
    /// How long acquiring a pooled connection may take
    pub connect_timeout: Duration,
    /// Server-side limit on a single statement
    pub query_timeout: Duration,
    pub max_connections: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            target: "localhost".to_string(),
            connect_timeout: Duration::from_secs(30),
            query_timeout: Duration::from_secs(30),
            max_connections: 2,
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.target)
    }
}

impl ConnectionConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Checks the pool limits and timeouts.
    ///
    /// # Errors
    /// Returns a configuration error naming the first out-of-range setting.
    pub fn validate(&self) -> Result<()> {
        if self.target.is_empty() {
            return Err(RecodeError::configuration("connection target cannot be empty"));
        }
        if self.max_connections == 0 || self.max_connections > MAX_POOL_CONNECTIONS {
            return Err(RecodeError::configuration(format!(
                "max_connections must be between 1 and {}",
                MAX_POOL_CONNECTIONS
            )));
        }
        if self.connect_timeout.is_zero() {
            return Err(RecodeError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }
        if self.query_timeout.is_zero() {
            return Err(RecodeError::configuration(
                "query_timeout must be greater than 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_is_small() {
        let config = ConnectionConfig::default();
        assert_eq!(config.max_connections, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_out_of_range_settings_are_rejected() {
        let rejected = [
            ConnectionConfig::new(""),
            ConnectionConfig::default().with_max_connections(0),
            ConnectionConfig::default().with_max_connections(MAX_POOL_CONNECTIONS + 1),
            ConnectionConfig::default().with_connect_timeout(Duration::ZERO),
            ConnectionConfig::default().with_query_timeout(Duration::ZERO),
        ];
        for config in rejected {
            assert!(
                matches!(config.validate(), Err(RecodeError::Configuration { .. })),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_display_is_the_target() {
        let config = ConnectionConfig::new("example.com:3306/shop");
        assert_eq!(format!("{}", config), "example.com:3306/shop");
    }
}
