//! Storage Engine Benchmark Harness
//!
//! Compares equivalent data-access workloads across a relational engine
//! (PostgreSQL, MariaDB), a document store (MongoDB) and a wide-column store
//! (Cassandra), and records timings as a function of workload size.
//!
//! # Components
//!
//! - **Catalog**: logical tests and target backends
//! - **Compile**: one compiler per backend family turning a logical test into
//!   an equivalent native operation
//! - **Harness**: repeated execution with rollback isolation and timing
//! - **Recorder**: append-only `(test, backend)` series and merged reads
//!
//! # Example
//!
//! ```no_run
//! use storebench::{Backend, Benchmark, BenchConfig, SqliteConnection};
//!
//! let mut conn = SqliteConnection::open_in_memory()?;
//! conn.apply_schema()?;
//!
//! let bench = Benchmark::new(BenchConfig::from_env()?);
//! let report = bench.run(&mut conn, Backend::Postgres, "select_base", 100, 5)?;
//! println!("{:.6}s per call", report.sample.avg_seconds);
//! # Ok::<(), storebench::Error>(())
//! ```

pub mod catalog;
pub mod compile;
pub mod config;
pub mod connection;
pub mod error;
pub mod fixtures;
pub mod harness;
pub mod operation;
pub mod recorder;
pub mod schema;
pub mod timestamp;

pub use catalog::{Backend, BackendFamily, LogicalTest, TestKind};
pub use compile::{compiler_for, BackendCompiler, Dialect};
pub use config::{BenchConfig, Credentials};
pub use connection::{Connection, DryRunConnection, SqliteConnection, Transaction};
#[cfg(any(feature = "postgres", feature = "mysql"))]
pub use connection::SqlxConnection;
pub use error::{BackendError, Error, PersistenceWarning, Result};
pub use fixtures::{IdStrategy, OffsetIds};
pub use harness::{measure, measure_with, Benchmark, HarnessOptions, IsolationScope, Measurement, RunReport};
pub use operation::{CompiledOperation, Footprint, OperationBody};
pub use recorder::{MergedSeries, ResultRecorder, Sample, TimingSample};
