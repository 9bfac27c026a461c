//! Engine lifecycle
//!
//! [`EngineManager`] owns at most one embedded DuckDB instance and one
//! connection. Bring-up happens on first [`EngineManager::acquire_connection`];
//! concurrent callers during bring-up wait on the same initialization, and a
//! failed bring-up leaves the manager uninitialized so the next call retries.

use crate::coerce::RawRow;
use crate::config::{Config, DatasetsConfig};
use crate::error::{Error, Result};
use crate::types::Relation;
use duckdb::types::{ToSqlOutput, Value};
use duckdb::{params_from_iter, Connection, ToSql};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::OnceCell;

/// I/O backend the engine is brought up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Snapshots are local files; built-in Parquet reader only
    Local,
    /// At least one snapshot is a URL; loads `httpfs`
    Remote,
}

impl Backend {
    /// Pick the backend able to read every configured location.
    pub fn select(datasets: &DatasetsConfig) -> Self {
        if datasets.has_remote() {
            Backend::Remote
        } else {
            Backend::Local
        }
    }
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Param {
    Int(i64),
    Text(String),
}

impl Param {
    /// Limits and offsets saturate at `i64::MAX`.
    pub fn count(n: usize) -> Self {
        Param::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

impl From<&str> for Param {
    fn from(s: &str) -> Self {
        Param::Text(s.to_string())
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Int(v)
    }
}

impl ToSql for Param {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        match self {
            Param::Int(v) => v.to_sql(),
            Param::Text(s) => s.to_sql(),
        }
    }
}

/// The brought-up engine and its single connection.
pub struct Engine {
    conn: Mutex<Connection>,
    backend: Backend,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Open the database and connection. Blocking.
    fn open(config: &Config) -> Result<Self> {
        config
            .engine
            .validate()
            .map_err(|e| Error::EngineInit(e.to_string()))?;
        let backend = Backend::select(&config.datasets);
        let init_err = |what: &str, e: duckdb::Error| Error::EngineInit(format!("{}: {}", what, e));

        let mut db_config = duckdb::Config::default();
        if let Some(threads) = config.engine.threads {
            db_config = db_config
                .threads(i64::from(threads))
                .map_err(|e| init_err("invalid thread count", e))?;
        }
        if let Some(limit) = &config.engine.memory_limit {
            db_config = db_config
                .max_memory(limit)
                .map_err(|e| init_err("invalid memory limit", e))?;
        }

        let conn = match &config.engine.database {
            Some(path) => Connection::open_with_flags(path, db_config),
            None => Connection::open_in_memory_with_flags(db_config),
        }
        .map_err(|e| init_err("failed to open database", e))?;

        if backend == Backend::Remote {
            conn.execute_batch("INSTALL httpfs; LOAD httpfs;")
                .map_err(|e| init_err("failed to load httpfs", e))?;
        }

        tracing::info!(
            backend = ?backend,
            database = ?config.engine.database,
            threads = ?config.engine.threads,
            "Engine initialized"
        );

        Ok(Self {
            conn: Mutex::new(conn),
            backend,
        })
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// The shared connection. Holding the guard serializes engine access.
    pub(crate) fn connection(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-query leaves the connection itself usable
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run one parameterized query and collect its rows.
    ///
    /// `relations` are the views the query reads; an engine error about a
    /// missing table among them surfaces as [`Error::RelationNotFound`].
    pub fn query(
        &self,
        label: &'static str,
        sql: &str,
        params: &[Param],
        relations: &[Relation],
    ) -> Result<Vec<RawRow>> {
        let started = Instant::now();
        let conn = self.connection();
        let fail = |e: duckdb::Error| classify(label, relations, e);

        let mut stmt = conn.prepare(sql).map_err(fail)?;
        let mut rows = stmt.query(params_from_iter(params.iter())).map_err(fail)?;
        let columns: Arc<[String]> = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default()
            .into();

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(fail)? {
            let values = (0..columns.len())
                .map(|i| row.get::<_, Value>(i))
                .collect::<duckdb::Result<Vec<_>>>()
                .map_err(fail)?;
            out.push(RawRow::new(Arc::clone(&columns), values));
        }

        tracing::debug!(
            query = label,
            rows = out.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query executed"
        );
        Ok(out)
    }

    /// Run a blocking closure against the engine off the async executor.
    pub(crate) async fn run<T, F>(self: &Arc<Self>, f: F) -> Result<T>
    where
        F: FnOnce(&Engine) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(self);
        match tokio::task::spawn_blocking(move || f(&engine)).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(Error::Io(std::io::Error::from(e))),
        }
    }
}

fn classify(label: &'static str, relations: &[Relation], err: duckdb::Error) -> Error {
    let message = err.to_string();
    if message.contains("Catalog Error") && message.contains("does not exist") {
        if let Some(relation) = relations
            .iter()
            .find(|r| message.contains(&format!("name {}", r.as_str())))
        {
            return Error::RelationNotFound(*relation);
        }
    }
    tracing::warn!(query = label, error = %message, "Query failed");
    Error::query(label, err)
}

/// Owner of the process's engine handle.
///
/// Share one manager (for example inside an `Arc`) to share the engine.
#[derive(Debug)]
pub struct EngineManager {
    config: Config,
    engine: OnceCell<Arc<Engine>>,
}

impl EngineManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            engine: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return the engine, bringing it up on first use.
    pub async fn acquire_connection(&self) -> Result<Arc<Engine>> {
        self.engine
            .get_or_try_init(|| async {
                let config = self.config.clone();
                let opened = tokio::task::spawn_blocking(move || Engine::open(&config))
                    .await
                    .map_err(|e| Error::EngineInit(format!("bring-up task failed: {}", e)))?;
                if let Err(e) = &opened {
                    tracing::warn!(error = %e, "Engine bring-up failed; will retry on next use");
                }
                opened.map(Arc::new)
            })
            .await
            .map(Arc::clone)
    }

    /// True once bring-up has completed.
    pub fn is_initialized(&self) -> bool {
        self.engine.initialized()
    }
}
