//! Error types for sessionlens-core

use crate::types::Relation;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the sessionlens-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Engine bring-up failed (backend selection, open, or connect)
    #[error("engine initialization failed: {0}")]
    EngineInit(String),

    /// A relation's backing source could not be attached
    #[error("dataset for relation `{relation}` is unavailable: {reason}")]
    DatasetUnavailable { relation: Relation, reason: String },

    /// A query referenced a relation that was never attached
    #[error("relation not found: {0}")]
    RelationNotFound(Relation),

    /// The engine rejected a query at execution time
    #[error("query `{query}` failed: {source}")]
    QueryExecution {
        query: &'static str,
        #[source]
        source: duckdb::Error,
    },

    /// The caller's timeout elapsed; the query may still be running
    #[error("engine busy or unresponsive after {0:?}")]
    EngineBusy(Duration),

    /// A result value did not fit the field's declared kind
    #[error("cannot coerce column `{column}` to {expected}: found {found}")]
    Coercion {
        column: String,
        expected: &'static str,
        found: String,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn query(query: &'static str, source: duckdb::Error) -> Self {
        Error::QueryExecution { query, source }
    }
}

/// Result type alias for sessionlens-core
pub type Result<T> = std::result::Result<T, Error>;
