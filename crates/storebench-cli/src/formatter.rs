//! Output formatters for run reports and series.

use clap::ValueEnum;
use comfy_table::Table;
use serde_json::json;
use storebench::{Backend, CompiledOperation, MergedSeries, RunReport, TestKind};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format the outcome of one benchmark run.
    fn format_run(&self, report: &RunReport) -> String;

    /// Format every backend's series of one test.
    fn format_series(&self, test: &str, merged: &MergedSeries) -> String;

    /// Format a compiled operation.
    fn format_operation(&self, op: &CompiledOperation) -> String;

    /// Format the known tests and backends.
    fn format_catalog(&self) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_run(&self, report: &RunReport) -> String {
        let m = &report.measurement;
        let mut table = Table::new();
        table.set_header(vec![
            "backend",
            "test",
            "records",
            "repetitions",
            "failures",
            "rows",
            "avg_seconds",
        ]);
        table.add_row(vec![
            report.sample.backend.clone(),
            report.sample.test.clone(),
            report.sample.record_count.to_string(),
            m.repetitions.to_string(),
            m.failures.to_string(),
            m.rows.to_string(),
            format!("{:.6}", report.sample.avg_seconds),
        ]);

        let mut output = table.to_string();
        if !report.recorded {
            output.push_str("\n(unknown test, not recorded)");
        }
        output
    }

    fn format_series(&self, test: &str, merged: &MergedSeries) -> String {
        if merged.is_empty() {
            return format!("No samples for {test}");
        }

        let mut table = Table::new();
        table.set_header(vec!["backend", "records", "avg_seconds"]);
        for (backend, samples) in &merged.series {
            for sample in samples {
                table.add_row(vec![
                    backend.clone(),
                    sample.record_count.to_string(),
                    format!("{:.6}", sample.avg_seconds),
                ]);
            }
        }

        let mut output = table.to_string();
        if !merged.warnings.is_empty() {
            output.push_str(&format!("\n{} malformed line(s) skipped", merged.warnings.len()));
        }
        output
    }

    fn format_operation(&self, op: &CompiledOperation) -> String {
        if op.is_noop() {
            return "(no-op)".to_string();
        }
        op.to_string()
    }

    fn format_catalog(&self) -> String {
        let mut table = Table::new();
        table.set_header(vec!["test", "mutation", "order lines"]);
        for kind in TestKind::ALL {
            table.add_row(vec![
                kind.name().to_string(),
                yes_no(kind.is_mutation()).to_string(),
                yes_no(kind.touches_children()).to_string(),
            ]);
        }

        let mut backends = Table::new();
        backends.set_header(vec!["backend", "family", "transactional"]);
        for backend in Backend::ALL {
            backends.add_row(vec![
                backend.name().to_string(),
                format!("{:?}", backend.family()),
                yes_no(backend.is_transactional()).to_string(),
            ]);
        }

        format!("{table}\n\n{backends}")
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_run(&self, report: &RunReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn format_series(&self, test: &str, merged: &MergedSeries) -> String {
        let warnings: Vec<String> = merged.warnings.iter().map(ToString::to_string).collect();
        serde_json::to_string_pretty(&json!({
            "test": test,
            "series": merged.series,
            "warnings": warnings,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_operation(&self, op: &CompiledOperation) -> String {
        let body = if !op.document_ops().is_empty() {
            json!({ "documents": op.document_ops() })
        } else {
            json!({ "statements": op.statements() })
        };
        serde_json::to_string_pretty(&json!({
            "operation": body,
            "footprint": op.footprint,
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }

    fn format_catalog(&self) -> String {
        let tests: Vec<&str> = TestKind::ALL.iter().map(|kind| kind.name()).collect();
        let backends: Vec<&str> = Backend::ALL.iter().map(|backend| backend.name()).collect();
        serde_json::to_string_pretty(&json!({ "tests": tests, "backends": backends }))
            .unwrap_or_else(|_| "{}".to_string())
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_run(&self, report: &RunReport) -> String {
        let m = &report.measurement;
        format!(
            "backend,test,records,repetitions,failures,rows,avg_seconds\n{},{},{},{},{},{},{}",
            report.sample.backend,
            report.sample.test,
            report.sample.record_count,
            m.repetitions,
            m.failures,
            m.rows,
            report.sample.avg_seconds,
        )
    }

    fn format_series(&self, _test: &str, merged: &MergedSeries) -> String {
        let mut output = String::from("backend,records,avg_seconds\n");
        for (backend, samples) in &merged.series {
            for sample in samples {
                output.push_str(&format!(
                    "{},{},{}\n",
                    backend, sample.record_count, sample.avg_seconds
                ));
            }
        }
        output
    }

    fn format_operation(&self, op: &CompiledOperation) -> String {
        let mut output = String::from("statement\n");
        if !op.document_ops().is_empty() {
            for doc in op.document_ops() {
                let text = serde_json::to_string(doc).unwrap_or_default();
                output.push_str(&format!("\"{}\"\n", escape_csv(&text)));
            }
        } else {
            for statement in op.statements() {
                output.push_str(&format!("\"{}\"\n", escape_csv(statement)));
            }
        }
        output
    }

    fn format_catalog(&self) -> String {
        let mut output = String::from("kind,name\n");
        for kind in TestKind::ALL {
            output.push_str(&format!("test,{}\n", kind.name()));
        }
        for backend in Backend::ALL {
            output.push_str(&format!("backend,{}\n", backend.name()));
        }
        output
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}
