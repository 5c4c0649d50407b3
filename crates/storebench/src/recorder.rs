//! Persisted timing series.
//!
//! One append-only file per `(test, backend)` at
//! `<root>/<test>/<backend>.csv`, one `count,avg_seconds` line per sample and
//! no header. Each sample is written with a single append so a crash never
//! leaves half a line behind; readers still skip malformed lines.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, PersistenceWarning, Result};

const SERIES_EXTENSION: &str = "csv";

/// One recorded measurement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingSample {
    pub backend: String,
    pub test: String,
    pub record_count: i64,
    pub avg_seconds: f64,
}

/// A point of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub record_count: i64,
    pub avg_seconds: f64,
}

/// Every backend's series for one test.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedSeries {
    /// Backend name to samples, ascending by record count.
    pub series: BTreeMap<String, Vec<Sample>>,
    /// Lines skipped while reading.
    #[serde(skip)]
    pub warnings: Vec<PersistenceWarning>,
}

impl MergedSeries {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Appends and reads timing series under a root directory.
#[derive(Debug, Clone)]
pub struct ResultRecorder {
    root: PathBuf,
}

impl ResultRecorder {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the `(test, backend)` series.
    pub fn series_path(&self, test: &str, backend: &str) -> PathBuf {
        self.root
            .join(test)
            .join(format!("{backend}.{SERIES_EXTENSION}"))
    }

    /// Append one sample to the `(test, backend)` series.
    ///
    /// Duplicate counts accumulate. Concurrent writers must target
    /// different series.
    pub fn record(&self, backend: &str, test: &str, record_count: i64, avg_seconds: f64) -> Result<()> {
        validate_component("backend", backend)?;
        validate_component("test", test)?;
        if !avg_seconds.is_finite() || avg_seconds < 0.0 {
            return Err(Error::invalid(format!(
                "average duration must be a non-negative number, got {avg_seconds}"
            )));
        }

        let path = self.series_path(test, backend);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        // the buffer holds the whole row, so flush issues one append
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        writer.serialize(Sample {
            record_count,
            avg_seconds,
        })?;
        writer.flush()?;

        tracing::debug!(path = %path.display(), record_count, avg_seconds, "recorded sample");
        Ok(())
    }

    /// Read the `(test, backend)` series, ascending by record count.
    ///
    /// A missing file is an empty series.
    pub fn series(&self, test: &str, backend: &str) -> Result<(Vec<Sample>, Vec<PersistenceWarning>)> {
        read_series(&self.series_path(test, backend))
    }

    /// Every backend's series for `test`.
    pub fn merged_series(&self, test: &str) -> Result<MergedSeries> {
        let dir = self.root.join(test);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(MergedSeries::default()),
            Err(e) => return Err(e.into()),
        };

        let mut merged = MergedSeries::default();
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SERIES_EXTENSION) {
                continue;
            }
            let Some(backend) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let (samples, warnings) = read_series(&path)?;
            merged.series.insert(backend.to_string(), samples);
            merged.warnings.extend(warnings);
        }
        Ok(merged)
    }
}

fn validate_component(what: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(Error::invalid(format!("{what} name cannot be used as a path: {value:?}")))
    }
}

fn read_series(path: &Path) -> Result<(Vec<Sample>, Vec<PersistenceWarning>)> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok((Vec::new(), Vec::new())),
        Err(e) => return Err(e.into()),
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut samples = Vec::new();
    let mut warnings = Vec::new();
    let mut record = csv::StringRecord::new();
    loop {
        let parsed = match reader.read_record(&mut record) {
            Ok(false) => break,
            Ok(true) => parse_record(&record).map_err(|reason| (record.position().cloned(), reason)),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => Err((e.position().cloned(), e.to_string())),
        };
        match parsed {
            Ok(sample) => samples.push(sample),
            Err((position, reason)) => {
                let warning = PersistenceWarning {
                    path: path.display().to_string(),
                    line: position.map_or(0, |pos| pos.line() as usize),
                    reason,
                };
                tracing::warn!(%warning, "skipping malformed sample");
                warnings.push(warning);
            }
        }
    }

    // stable: equal counts keep their append order
    samples.sort_by_key(|sample| sample.record_count);
    Ok((samples, warnings))
}

fn parse_record(record: &csv::StringRecord) -> std::result::Result<Sample, String> {
    if record.len() != 2 {
        return Err(format!("expected 2 fields, found {}", record.len()));
    }
    let sample: Sample = record.deserialize(None).map_err(|e| e.to_string())?;
    if !sample.avg_seconds.is_finite() {
        return Err(format!("duration is not a number: {:?}", &record[1]));
    }
    Ok(sample)
}
