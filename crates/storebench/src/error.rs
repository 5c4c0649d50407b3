//! Error types.

use std::fmt;

use thiserror::Error;

use crate::catalog::Backend;

/// Benchmark errors.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A backend call failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// No driver for this backend is linked into the binary.
    #[error("no connection available for backend {0}")]
    UnsupportedBackend(Backend),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Series file could not be written.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}

/// Result alias for benchmark operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure reported by a connection while executing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend error: {message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        BackendError::new(err.to_string())
    }
}

#[cfg(any(feature = "postgres", feature = "mysql"))]
impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        BackendError::new(err.to_string())
    }
}

/// A malformed row skipped while reading a persisted series.
///
/// Never fatal: readers collect these next to the samples they did parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceWarning {
    pub path: String,
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path, self.line, self.reason)
    }
}
