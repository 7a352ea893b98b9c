//! Recode session lifecycle.
//!
//! A session moves `Created -> Running -> Released`. The connection is
//! acquired on entering `Running` and released exactly once on entering
//! `Released`, whether the run succeeded or failed.

use super::{RecodeEngine, SessionReport};
use crate::adapters::ConnectionSource;
use crate::{Result, error::RecodeError};
use serde::Serialize;

/// Lifecycle state of a recode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Not yet started
    Created,
    /// Holding a connection and processing tables
    Running,
    /// Finished; terminal
    Released,
}

/// One run of the engine over one exclusively held connection.
///
/// # Example
/// ```rust
/// use dbrecode_core::adapters::{MemoryDatabase, RecodeConfig};
/// use dbrecode_core::engine::{RecodeEngine, RecodeSession, SessionState, Transform};
/// use dbrecode_core::models::{RawColumn, Value};
///
/// # async fn example() -> dbrecode_core::Result<()> {
/// let db = MemoryDatabase::new().with_table(
///     "people",
///     vec![RawColumn::new("id", "int(11)", "PRI"), RawColumn::new("city", "varchar(20)", "")],
///     vec![vec![Value::Int(1), Value::from("Rome")]],
/// );
/// let engine = RecodeEngine::new(RecodeConfig::default(), Transform::reverse())?;
/// let mut session = RecodeSession::new(db, engine);
///
/// let report = session.run().await?;
/// assert_eq!(report.planned_count(), 1);
/// assert_eq!(session.state(), SessionState::Released);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct RecodeSession<S: ConnectionSource> {
    source: S,
    engine: RecodeEngine,
    state: SessionState,
    report: SessionReport,
}

impl<S: ConnectionSource> RecodeSession<S> {
    pub fn new(source: S, engine: RecodeEngine) -> Self {
        let report = engine.new_report();
        Self {
            source,
            engine,
            state: SessionState::Created,
            report,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The report so far; complete once the session is released.
    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    /// Consumes the session, returning its report.
    pub fn into_report(self) -> SessionReport {
        self.report
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Acquires a connection, recodes every selected table, and releases the
    /// connection.
    ///
    /// # Errors
    /// Returns a session-fatal error if the connection cannot be acquired,
    /// is lost during the run, or cannot be released. If both the run and
    /// the release fail, the run's error is returned and the release error
    /// is logged. A session runs at most once.
    pub async fn run(&mut self) -> Result<&SessionReport> {
        if self.state != SessionState::Created {
            return Err(RecodeError::configuration(
                "recode session has already run",
            ));
        }

        let mut connection = match self.source.acquire().await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!("Failed to acquire connection: {}", e);
                self.state = SessionState::Released;
                return Err(e);
            }
        };
        self.state = SessionState::Running;

        let outcome = self
            .engine
            .recode_all(&mut connection, &mut self.report)
            .await;

        let released = self.source.release(connection).await;
        self.state = SessionState::Released;

        match (outcome, released) {
            (Ok(()), Ok(())) => {
                tracing::info!(
                    "Session finished: {} tables, {} planned, {} updated, {} failed",
                    self.report.tables.len(),
                    self.report.planned_count(),
                    self.report.updated_count(),
                    self.report.failed_count()
                );
                Ok(&self.report)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(release_error)) => Err(release_error),
            (Err(e), Err(release_error)) => {
                tracing::error!("Failed to release connection: {}", release_error);
                Err(e)
            }
        }
    }
}
