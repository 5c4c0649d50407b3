//! Connection capability consumed by the timing harness.
//!
//! The harness only needs to execute a compiled operation and, for
//! transactional backends, to begin and roll back. Native drivers plug in
//! by implementing [`Connection`]; the embedded SQLite connection and the
//! sqlx-based PostgreSQL/MariaDB connections live here.

pub mod sqlite;

#[cfg(any(feature = "postgres", feature = "mysql"))]
pub mod sqlx_backend;

use crate::error::BackendError;
use crate::operation::CompiledOperation;

pub use sqlite::SqliteConnection;

#[cfg(any(feature = "postgres", feature = "mysql"))]
pub use sqlx_backend::SqlxConnection;

/// An exclusively owned session with one backend.
pub trait Connection {
    /// Name used in logs.
    fn label(&self) -> &str;

    /// Whether [`begin`](Connection::begin) and
    /// [`rollback`](Connection::rollback) are meaningful.
    fn is_transactional(&self) -> bool {
        false
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Execute an operation, returning the rows it returned or affected.
    fn execute(&mut self, op: &CompiledOperation) -> Result<u64, BackendError>;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn label(&self) -> &str {
        (**self).label()
    }

    fn is_transactional(&self) -> bool {
        (**self).is_transactional()
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        (**self).begin()
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        (**self).rollback()
    }

    fn execute(&mut self, op: &CompiledOperation) -> Result<u64, BackendError> {
        (**self).execute(op)
    }
}

/// A transaction that is rolled back on every exit path.
///
/// There is no commit: measured mutations must never persist.
pub struct Transaction<'c, C: Connection + ?Sized> {
    conn: &'c mut C,
    open: bool,
}

impl<'c, C: Connection + ?Sized> Transaction<'c, C> {
    pub fn begin(conn: &'c mut C) -> Result<Self, BackendError> {
        conn.begin()?;
        Ok(Self { conn, open: true })
    }

    pub fn execute(&mut self, op: &CompiledOperation) -> Result<u64, BackendError> {
        self.conn.execute(op)
    }

    /// Roll back now and surface the result instead of logging it.
    pub fn rollback(mut self) -> Result<(), BackendError> {
        self.open = false;
        self.conn.rollback()
    }
}

impl<C: Connection + ?Sized> Drop for Transaction<'_, C> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.rollback() {
                tracing::warn!(connection = self.conn.label(), error = %e, "rollback failed");
            }
        }
    }
}

/// Logs operations instead of executing them.
///
/// Stands in for backends whose driver is not linked; reports the
/// operation's footprint as its row count.
#[derive(Debug, Clone)]
pub struct DryRunConnection {
    label: String,
    executed: usize,
}

impl DryRunConnection {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            executed: 0,
        }
    }

    /// Operations seen so far.
    pub fn executed(&self) -> usize {
        self.executed
    }
}

impl Connection for DryRunConnection {
    fn label(&self) -> &str {
        &self.label
    }

    fn execute(&mut self, op: &CompiledOperation) -> Result<u64, BackendError> {
        self.executed += 1;
        tracing::debug!(connection = %self.label, round_trips = op.len(), "dry run:\n{op}");
        Ok(op.footprint.total() as u64)
    }
}
