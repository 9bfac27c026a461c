//! # sessionlens-core
//!
//! Embedded analytics over session, message, and tool-call snapshots.
//!
//! This library provides:
//! - Lazy bring-up of one embedded DuckDB engine per [`Analytics`] handle
//! - Idempotent attachment of the three Parquet snapshots as views
//! - A fixed catalog of typed aggregation and lookup queries
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Every catalog call flows through four layers:
//! - **Engine** ([`engine`]): one engine, one connection, created on first use
//! - **Datasets** ([`datasets`]): `sessions`, `messages`, `tool_calls` views
//! - **Catalog** ([`catalog`]): one parameterized query per operation
//! - **Coercion** ([`coerce`]): engine-native values to `i64`/`f64`/`String`
//!
//! ## Example
//!
//! ```rust,no_run
//! use sessionlens_core::{Analytics, Config};
//!
//! # async fn run() -> sessionlens_core::Result<()> {
//! let config = Config::load()?;
//! let analytics = Analytics::new(config);
//!
//! let stats = analytics.get_stats().await?;
//! println!("{} sessions, {} messages", stats.sessions, stats.messages);
//!
//! if let Some(session) = analytics.get_session_by_id("s1").await? {
//!     println!("{} ({})", session.session_id, session.project_name);
//! }
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use catalog::{with_timeout, Analytics};
pub use config::Config;
pub use datasets::AttachmentStatus;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod catalog;
pub mod coerce;
pub mod config;
pub mod datasets;
pub mod engine;
pub mod error;
pub mod logging;
pub mod types;
