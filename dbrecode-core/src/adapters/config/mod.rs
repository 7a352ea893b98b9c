//! Configuration types for database access and recode sessions.
//!
//! - `ConnectionConfig`: Pool limits, timeouts and a display-safe target
//! - `RecodeConfig`: Dry-run flag, primary-key marker, type map extensions
//!   and table selection
//!
//! # Security
//! These configuration structs intentionally do NOT store passwords or credentials.

mod connection;
mod recode;

pub use connection::{ConnectionConfig, MAX_POOL_CONNECTIONS};
pub use recode::RecodeConfig;
