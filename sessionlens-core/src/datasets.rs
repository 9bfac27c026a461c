//! Dataset registration
//!
//! Binds the three Parquet snapshots to the `sessions`, `messages`, and
//! `tool_calls` views. All sources are resolved before any view is created.
//! Each relation is tracked separately and defined at most once per
//! registrar, so a broken snapshot never takes the other two down with it.

use crate::config::{is_remote, DatasetsConfig};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::types::Relation;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Attachment state of one relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentStatus {
    /// Never attempted
    Pending,
    Attached,
    /// Last attempt failed with this reason
    Failed(String),
}

/// A source that passed registration and is ready for its view.
#[derive(Debug)]
struct RegisteredSource {
    relation: Relation,
    scan: String,
}

/// Quote a string as a SQL literal.
///
/// Only used for configured locations; DuckDB DDL cannot bind parameters.
fn sql_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn register(datasets: &DatasetsConfig, relation: Relation) -> Result<RegisteredSource> {
    let location = datasets.location(relation);
    if !is_remote(&location) && !Path::new(&location).is_file() {
        return Err(Error::DatasetUnavailable {
            relation,
            reason: format!("no snapshot file at {}", location),
        });
    }
    Ok(RegisteredSource {
        relation,
        scan: format!("read_parquet({})", sql_literal(&location)),
    })
}

fn define_view(engine: &Engine, source: &RegisteredSource) -> Result<()> {
    let conn = engine.connection();
    let name = source.relation.as_str();
    let unavailable = |e: duckdb::Error| Error::DatasetUnavailable {
        relation: source.relation,
        reason: e.to_string(),
    };

    // Replace, so a persistent database never keeps a view of an old location
    conn.execute_batch(&format!(
        "CREATE OR REPLACE VIEW {} AS SELECT * FROM {}",
        name, source.scan
    ))
    .map_err(unavailable)?;

    // A malformed snapshot must fail attachment, not the first query.
    if let Err(e) = conn.execute_batch(&format!("SELECT * FROM {} LIMIT 0", name)) {
        let _ = conn.execute_batch(&format!("DROP VIEW IF EXISTS {}", name));
        return Err(unavailable(e));
    }
    Ok(())
}

/// Register every pending relation, then define its view.
fn attach(
    engine: &Engine,
    datasets: &DatasetsConfig,
    relations: &[Relation],
) -> Vec<(Relation, Result<()>)> {
    let registered: Vec<(Relation, Result<RegisteredSource>)> = relations
        .iter()
        .map(|relation| (*relation, register(datasets, *relation)))
        .collect();

    registered
        .into_iter()
        .map(|(relation, source)| (relation, source.and_then(|s| define_view(engine, &s))))
        .collect()
}

/// Tracks which relations are attached and attaches the rest on demand.
#[derive(Debug)]
pub struct DatasetRegistrar {
    datasets: DatasetsConfig,
    status: Mutex<[AttachmentStatus; 3]>,
}

impl DatasetRegistrar {
    pub fn new(datasets: DatasetsConfig) -> Self {
        Self {
            datasets,
            status: Mutex::new([
                AttachmentStatus::Pending,
                AttachmentStatus::Pending,
                AttachmentStatus::Pending,
            ]),
        }
    }

    /// Attach every relation that is not attached yet, retrying failed ones.
    ///
    /// Returns the first [`Error::DatasetUnavailable`]; relations that did
    /// attach stay usable. Once all three are attached this is a no-op.
    pub async fn ensure_datasets_attached(&self, engine: &Arc<Engine>) -> Result<()> {
        self.attach_matching(engine, |s| *s != AttachmentStatus::Attached)
            .await
    }

    /// Attach only relations never attempted. Failed relations stay failed.
    pub async fn attach_pending(&self, engine: &Arc<Engine>) -> Result<()> {
        self.attach_matching(engine, |s| *s == AttachmentStatus::Pending)
            .await
    }

    async fn attach_matching(
        &self,
        engine: &Arc<Engine>,
        wanted: impl Fn(&AttachmentStatus) -> bool,
    ) -> Result<()> {
        let mut status = self.status.lock().await;
        let todo: Vec<Relation> = Relation::ALL
            .into_iter()
            .filter(|r| wanted(&status[r.index()]))
            .collect();
        if todo.is_empty() {
            return Ok(());
        }

        let datasets = self.datasets.clone();
        let outcomes = engine
            .run(move |engine| Ok(attach(engine, &datasets, &todo)))
            .await?;

        let mut first_error = None;
        for (relation, outcome) in outcomes {
            match outcome {
                Ok(()) => {
                    tracing::info!(
                        relation = %relation,
                        location = %self.datasets.location(relation),
                        "Relation attached"
                    );
                    status[relation.index()] = AttachmentStatus::Attached;
                }
                Err(e) => {
                    tracing::warn!(relation = %relation, error = %e, "Relation unavailable");
                    let reason = match &e {
                        Error::DatasetUnavailable { reason, .. } => reason.clone(),
                        other => other.to_string(),
                    };
                    status[relation.index()] = AttachmentStatus::Failed(reason);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub async fn status(&self, relation: Relation) -> AttachmentStatus {
        self.status.lock().await[relation.index()].clone()
    }

    /// First relation in `relations` that is not attached.
    pub async fn first_unattached(&self, relations: &[Relation]) -> Option<Relation> {
        let status = self.status.lock().await;
        relations
            .iter()
            .copied()
            .find(|r| status[r.index()] != AttachmentStatus::Attached)
    }
}
