//! Execution and timing harness.
//!
//! [`measure`] runs one compiled operation a fixed number of times on one
//! connection and reports the mean wall-clock time. Transactional backends
//! run inside a [`Transaction`] that is always rolled back, so mutating tests
//! can be repeated against the same data. [`Benchmark`] ties compilation,
//! measurement and recording together for one `(backend, test, count)` run.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::{Backend, TestKind};
use crate::compile::{compiler_for, BackendCompiler};
use crate::config::BenchConfig;
use crate::connection::{Connection, Transaction};
use crate::error::{BackendError, Error, Result};
use crate::operation::CompiledOperation;
use crate::recorder::{ResultRecorder, TimingSample};

/// How far one transaction reaches on a transactional connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationScope {
    /// Begin and roll back around every repetition.
    #[default]
    PerRepetition,
    /// One transaction around all repetitions, rolled back at the end.
    WholeRun,
}

/// Harness options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarnessOptions {
    pub isolation: IsolationScope,
}

impl HarnessOptions {
    pub fn with_isolation(mut self, isolation: IsolationScope) -> Self {
        self.isolation = isolation;
        self
    }
}

/// Outcome of one [`measure`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// Executions attempted.
    pub repetitions: u32,
    /// Executions that raised a backend error.
    pub failures: u32,
    /// Wall-clock time of the whole loop, failures included.
    pub total: Duration,
    /// Rows returned or affected by the last successful execution.
    pub rows: u64,
}

impl Measurement {
    /// Mean time per repetition.
    pub fn average(&self) -> Duration {
        self.total / self.repetitions.max(1)
    }

    pub fn avg_seconds(&self) -> f64 {
        self.average().as_secs_f64()
    }

    pub fn succeeded(&self) -> u32 {
        self.repetitions - self.failures
    }
}

/// Measure `op` with default options.
pub fn measure<C>(conn: &mut C, op: &CompiledOperation, repetitions: u32) -> Result<Measurement>
where
    C: Connection + ?Sized,
{
    measure_with(conn, op, repetitions, HarnessOptions::default())
}

/// Execute `op` exactly `repetitions` times and time the whole loop.
///
/// Backend errors are logged and counted, never returned: a repetition that
/// fails still contributes its elapsed time. Only `repetitions == 0` is an
/// error.
pub fn measure_with<C>(
    conn: &mut C,
    op: &CompiledOperation,
    repetitions: u32,
    options: HarnessOptions,
) -> Result<Measurement>
where
    C: Connection + ?Sized,
{
    if repetitions == 0 {
        return Err(Error::invalid("repetitions must be at least 1"));
    }

    // owned so the transaction guard can hold `conn` mutably meanwhile
    let label = conn.label().to_string();
    let mut tally = Tally::default();
    let start = Instant::now();

    if !conn.is_transactional() {
        for _ in 0..repetitions {
            let outcome = conn.execute(op);
            tally.observe(&label, outcome);
        }
    } else {
        match options.isolation {
            IsolationScope::PerRepetition => {
                for _ in 0..repetitions {
                    match Transaction::begin(&mut *conn) {
                        Ok(mut tx) => {
                            let outcome = tx.execute(op);
                            finish(tx);
                            tally.observe(&label, outcome);
                        }
                        Err(e) => tally.observe(&label, Err(e)),
                    }
                }
            }
            IsolationScope::WholeRun => match Transaction::begin(&mut *conn) {
                Ok(mut tx) => {
                    let mut outcomes = Vec::with_capacity(repetitions as usize);
                    for _ in 0..repetitions {
                        outcomes.push(tx.execute(op));
                    }
                    finish(tx);
                    for outcome in outcomes {
                        tally.observe(&label, outcome);
                    }
                }
                Err(e) => {
                    for _ in 0..repetitions {
                        tally.observe(&label, Err(e.clone()));
                    }
                }
            },
        }
    }

    let measurement = Measurement {
        repetitions,
        failures: tally.failures,
        total: start.elapsed(),
        rows: tally.rows,
    };
    tracing::info!(
        connection = %label,
        repetitions,
        failures = measurement.failures,
        avg_seconds = measurement.avg_seconds(),
        "measured operation"
    );
    Ok(measurement)
}

#[derive(Default)]
struct Tally {
    failures: u32,
    rows: u64,
}

impl Tally {
    fn observe(&mut self, label: &str, outcome: std::result::Result<u64, BackendError>) {
        match outcome {
            Ok(rows) => self.rows = rows,
            Err(e) => {
                self.failures += 1;
                tracing::warn!(connection = label, error = %e, "repetition failed");
            }
        }
    }
}

fn finish<C: Connection + ?Sized>(tx: Transaction<'_, C>) {
    if let Err(e) = tx.rollback() {
        tracing::warn!(error = %e, "rollback failed");
    }
}

/// Result of one [`Benchmark::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub sample: TimingSample,
    pub measurement: Measurement,
    /// Whether the sample was appended to its series.
    pub recorded: bool,
}

/// Compiles, measures and records benchmark runs.
pub struct Benchmark {
    config: BenchConfig,
    recorder: ResultRecorder,
}

impl Benchmark {
    pub fn new(config: BenchConfig) -> Self {
        let recorder = ResultRecorder::new(&config.results_dir);
        Self { config, recorder }
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn recorder(&self) -> &ResultRecorder {
        &self.recorder
    }

    /// Compiler for `backend` configured from this benchmark's settings.
    pub fn compiler(&self, backend: Backend) -> Box<dyn BackendCompiler> {
        match backend {
            Backend::Cassandra => Box::new(crate::compile::WideColumnCompiler::with_keyspace(
                self.config.keyspace.clone(),
                self.config.ids.clone(),
            )),
            _ => compiler_for(backend, self.config.ids.clone()),
        }
    }

    /// Run `test_name` with `record_count` records on `conn`.
    ///
    /// Unknown test names and non-positive record counts measure a no-op
    /// and are not recorded.
    pub fn run<C>(
        &self,
        conn: &mut C,
        backend: Backend,
        test_name: &str,
        record_count: i64,
        repetitions: u32,
    ) -> Result<RunReport>
    where
        C: Connection + ?Sized,
    {
        let op = self.compiler(backend).compile_named(test_name, record_count);
        let measurement = measure_with(conn, &op, repetitions, self.config.harness_options())?;

        let sample = TimingSample {
            backend: backend.name().to_string(),
            test: test_name.to_string(),
            record_count,
            avg_seconds: measurement.avg_seconds(),
        };

        let recorded = match TestKind::lookup(test_name) {
            Some(_) if record_count <= 0 => {
                tracing::warn!(
                    backend = %backend,
                    test = test_name,
                    records = record_count,
                    "empty workload, sample not recorded"
                );
                false
            }
            Some(kind) => {
                self.recorder
                    .record(backend.name(), kind.name(), record_count, sample.avg_seconds)?;
                true
            }
            None => {
                tracing::warn!(backend = %backend, test = test_name, "unknown test, sample not recorded");
                false
            }
        };

        tracing::debug!(
            backend = %backend,
            test = test_name,
            records = record_count,
            recorded,
            "benchmark run complete"
        );

        Ok(RunReport {
            sample,
            measurement,
            recorded,
        })
    }
}
