//! storebench Command-Line Client
//!
//! Runs logical workloads against one backend, records the timings and
//! prints the merged series used for plotting.

mod formatter;
mod resolve;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use formatter::OutputFormat;
use resolve::ConnectionOptions;
use storebench::{Backend, BenchConfig, Benchmark, IsolationScope};

/// storebench Command-Line Client
#[derive(Parser, Debug)]
#[command(name = "storebench")]
#[command(version, about = "Compare equivalent workloads across storage engines")]
pub struct Args {
    /// Output format
    #[arg(long, global = true, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Results directory (overrides STOREBENCH_RESULTS)
    #[arg(long, global = true)]
    pub results: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Measure one test on one backend and record the sample
    Run(RunArgs),
    /// Print the operation a test compiles to
    Compile(TestArgs),
    /// Print every backend's recorded series for a test
    Series {
        /// Test identifier
        #[arg(short, long)]
        test: String,
    },
    /// List tests and backends
    Catalog,
}

#[derive(clap::Args, Debug)]
pub struct TestArgs {
    /// Target backend (postgres, mariadb, mongo, cassandra)
    #[arg(short, long)]
    pub backend: Backend,

    /// Test identifier, e.g. select_base
    #[arg(short, long)]
    pub test: String,

    /// Number of records the test works on
    #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..))]
    pub records: i64,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub test: TestArgs,

    /// Executions to average over (defaults to STOREBENCH_REPETITIONS or 1)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub executions: Option<u32>,

    /// Transaction scope on transactional backends
    #[arg(long, value_enum, default_value = "per-repetition")]
    pub isolation: Isolation,

    /// Run relational workloads on a SQLite file instead of a server
    #[arg(long)]
    pub sqlite: Option<PathBuf>,

    /// Load this many reference orders into the SQLite file first
    #[arg(long, requires = "sqlite")]
    pub seed: Option<i64>,

    /// Log operations instead of executing them
    #[arg(long, conflicts_with = "sqlite")]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Isolation {
    PerRepetition,
    WholeRun,
}

impl From<Isolation> for IsolationScope {
    fn from(isolation: Isolation) -> Self {
        match isolation {
            Isolation::PerRepetition => IsolationScope::PerRepetition,
            Isolation::WholeRun => IsolationScope::WholeRun,
        }
    }
}

fn main() {
    // Logs go to stderr so formatted output can be piped
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storebench=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = BenchConfig::from_env()?;
    if let Some(results) = &args.results {
        config = config.with_results_dir(results);
    }
    let formatter = formatter::create_formatter(args.format);

    match args.command {
        Command::Run(run) => {
            if let Some(executions) = run.executions {
                config = config.with_repetitions(executions);
            }
            config = config.with_isolation(run.isolation.into());

            let options = ConnectionOptions {
                dry_run: run.dry_run,
                sqlite: run.sqlite,
                seed: run.seed,
            };
            let mut conn = resolve::connect(run.test.backend, &options, &config)?;

            let repetitions = config.repetitions;
            let bench = Benchmark::new(config);
            let report = bench.run(
                &mut conn,
                run.test.backend,
                &run.test.test,
                run.test.records,
                repetitions,
            )?;
            println!("{}", formatter.format_run(&report));
        }
        Command::Compile(test) => {
            let bench = Benchmark::new(config);
            let op = bench
                .compiler(test.backend)
                .compile_named(&test.test, test.records);
            println!("{}", formatter.format_operation(&op));
        }
        Command::Series { test } => {
            let bench = Benchmark::new(config);
            let merged = bench.recorder().merged_series(&test)?;
            println!("{}", formatter.format_series(&test, &merged));
        }
        Command::Catalog => {
            println!("{}", formatter.format_catalog());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let args = Args::try_parse_from([
            "storebench", "run", "--backend", "Postgres", "--test", "insert_multi", "--records",
            "50", "--executions", "5", "--sqlite", "bench.db", "--seed", "100",
        ])
        .unwrap();

        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.test.backend, Backend::Postgres);
        assert_eq!(run.test.records, 50);
        assert_eq!(run.executions, Some(5));
        assert_eq!(run.seed, Some(100));
        assert_eq!(IsolationScope::from(run.isolation), IsolationScope::PerRepetition);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let parse = |argv: &[&str]| Args::try_parse_from(argv).is_err();
        assert!(parse(&["storebench", "run", "--backend", "oracle", "--test", "select_base", "--records", "1"]));
        assert!(parse(&["storebench", "run", "--backend", "mongo", "--test", "select_base", "--records", "0"]));
        assert!(parse(&[
            "storebench", "run", "--backend", "mongo", "--test", "select_base", "--records", "1",
            "--executions", "0",
        ]));
        assert!(parse(&["storebench", "run", "--backend", "mongo", "--test", "x", "--records", "1", "--seed", "5"]));
    }

    #[test]
    fn test_unknown_test_is_accepted() {
        let args = Args::try_parse_from([
            "storebench", "compile", "-b", "cassandra", "-t", "select_everything", "-r", "3",
        ]);
        assert!(args.is_ok());
    }
}
