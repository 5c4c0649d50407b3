//! Connection resolution for the `run` command.

use std::path::PathBuf;

use storebench::{Backend, BackendFamily, BenchConfig, Connection, DryRunConnection, Error, SqliteConnection};

/// Where a run's connection comes from.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    /// Log operations instead of executing them.
    pub dry_run: bool,
    /// Run relational workloads on this SQLite file.
    pub sqlite: Option<PathBuf>,
    /// Reference orders to load into the SQLite file first.
    pub seed: Option<i64>,
}

/// Open a connection for `backend`.
pub fn connect(
    backend: Backend,
    options: &ConnectionOptions,
    config: &BenchConfig,
) -> Result<Box<dyn Connection>, Error> {
    if options.dry_run {
        tracing::info!(backend = %backend, "dry run, operations are logged only");
        return Ok(Box::new(DryRunConnection::new(backend.name())));
    }

    if let Some(path) = &options.sqlite {
        if backend.family() != BackendFamily::Relational {
            return Err(Error::InvalidArgument(format!(
                "--sqlite runs relational workloads only, not {backend}"
            )));
        }
        let mut conn = SqliteConnection::open(path)?;
        conn.apply_schema()?;
        if let Some(orders) = options.seed {
            conn.seed(orders, config.ids.as_ref())?;
        }
        return Ok(Box::new(conn));
    }

    connect_server(backend, config)
}

#[cfg_attr(not(any(feature = "postgres", feature = "mysql")), allow(unused_variables))]
fn connect_server(backend: Backend, config: &BenchConfig) -> Result<Box<dyn Connection>, Error> {
    match backend {
        #[cfg(feature = "postgres")]
        Backend::Postgres => {
            let url = config.credentials(backend).url("postgres");
            Ok(Box::new(storebench::SqlxConnection::connect_postgres(&url)?))
        }
        #[cfg(feature = "mysql")]
        Backend::MariaDb => {
            let url = config.credentials(backend).url("mysql");
            Ok(Box::new(storebench::SqlxConnection::connect_mysql(&url)?))
        }
        other => Err(Error::UnsupportedBackend(other)),
    }
}
