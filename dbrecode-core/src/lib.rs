//! Core engine for dbrecode.
//!
//! dbrecode walks every table of a relational database, finds the columns
//! that hold text, and rewrites each text value through a pluggable
//! transform. Rows are addressed by primary key; tables without one are
//! reported and left untouched. Runs are dry by default: the engine computes
//! every change and reports it without writing.
//!
//! # Safety Guarantees
//! - No credentials stored or logged in any data structures
//! - Unknown column types stop the affected table before any write
//! - Every update is bound to a full primary key; unkeyed updates are refused
//!
//! # Architecture
//! - `classifier` and `models` describe columns
//! - `walker` and `keys` read schema metadata through `adapters`
//! - `engine` runs recode sessions over an exclusively held connection

pub mod adapters;
pub mod classifier;
pub mod datatype;
pub mod engine;
pub mod error;
pub mod keys;
pub mod logging;
pub mod models;
pub mod walker;

// Re-export commonly used types
pub use adapters::{
    ConnectionConfig, ConnectionSource, DatabaseAccess, MemoryDatabase, RecodeConfig,
};
pub use classifier::TypeClassifier;
pub use engine::{
    ChangeStatus, Diagnostic, RecodeEngine, RecodeSession, RowChange, SessionReport,
    SessionState, TableOutcome, TableReport, Transform,
};
pub use error::{RecodeError, Result};
pub use logging::init_logging;
pub use models::{ColumnDescriptor, RawColumn, RowCorrelation, Value};
pub use walker::SchemaWalker;

#[cfg(feature = "mysql")]
pub use adapters::mysql::MySqlSource;
