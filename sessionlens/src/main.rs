//! sessionlens - query session usage snapshots from the command line
//!
//! Runs one catalog operation against the configured Parquet snapshots and
//! prints its typed result as JSON.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/sessionlens/config.toml (~/.config/sessionlens/config.toml)
//! - Snapshots: $XDG_DATA_HOME/sessionlens/data/ unless `[datasets]` says otherwise

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sessionlens_core::{
    with_timeout, Analytics, Config, DEFAULT_LARGE_MESSAGE_CHARS, DEFAULT_LARGE_MESSAGE_LIMIT,
    DEFAULT_SESSION_PAGE_SIZE, DEFAULT_TOKEN_RANKING_LIMIT, DEFAULT_TOP_TOOLS_LIMIT,
};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "sessionlens")]
#[command(about = "Usage analytics over session snapshots")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/sessionlens/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory or URL prefix holding the snapshots (overrides config)
    #[arg(long)]
    data: Option<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Write logs to the state directory
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Every aggregate the dashboard shows
    Dashboard,

    /// Row counts of sessions, messages, and tool calls
    Stats,

    /// Most-used tools
    Tools {
        #[arg(short, long, default_value_t = DEFAULT_TOP_TOOLS_LIMIT)]
        limit: usize,
    },

    /// Sessions, newest first
    Sessions {
        #[arg(short, long, default_value_t = DEFAULT_SESSION_PAGE_SIZE)]
        limit: usize,
        #[arg(short, long, default_value_t = 0)]
        offset: usize,
    },

    /// One session with its messages and tool usage
    Session {
        /// Session identifier
        id: String,
    },

    /// Sessions ranked by estimated tokens
    Tokens {
        #[arg(short, long, default_value_t = DEFAULT_TOKEN_RANKING_LIMIT)]
        limit: usize,
    },

    /// Messages above a size threshold
    Large {
        #[arg(long, default_value_t = DEFAULT_LARGE_MESSAGE_CHARS)]
        min_chars: usize,
        #[arg(short, long, default_value_t = DEFAULT_LARGE_MESSAGE_LIMIT)]
        limit: usize,
    },
}

#[derive(Serialize)]
struct SessionReport {
    session: sessionlens_core::SessionDetail,
    messages: Vec<sessionlens_core::MessageDetail>,
    tool_calls: Vec<sessionlens_core::ToolCount>,
}

/// Apply the configured timeout, if any.
async fn bounded<T, F>(timeout: Option<Duration>, operation: F) -> sessionlens_core::Result<T>
where
    F: Future<Output = sessionlens_core::Result<T>>,
{
    match timeout {
        Some(limit) => with_timeout(limit, operation).await,
        None => operation.await,
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("failed to load configuration")?;
    if let Some(data) = &args.data {
        config.datasets = sessionlens_core::config::DatasetsConfig::with_base(data.clone());
    }

    let _log_guard = if args.verbose {
        Some(
            sessionlens_core::logging::init(&config.logging)
                .context("failed to initialize logging")?,
        )
    } else {
        None
    };
    tracing::info!(command = ?args.command, datasets = %config.datasets.base, "Running command");

    let timeout = config.engine.query_timeout_secs.map(Duration::from_secs);
    let analytics = Analytics::new(config);
    let pretty = args.pretty;

    match args.command {
        Command::Dashboard => {
            let snapshot = bounded(timeout, analytics.get_dashboard_snapshot())
                .await
                .context("failed to build dashboard")?;
            print_json(&snapshot, pretty)
        }
        Command::Stats => {
            let stats = bounded(timeout, analytics.get_stats())
                .await
                .context("failed to count rows")?;
            print_json(&stats, pretty)
        }
        Command::Tools { limit } => {
            let tools = bounded(timeout, analytics.get_top_tools(limit))
                .await
                .context("failed to rank tools")?;
            print_json(&tools, pretty)
        }
        Command::Sessions { limit, offset } => {
            let sessions = bounded(timeout, analytics.get_session_list(limit, offset))
                .await
                .context("failed to list sessions")?;
            print_json(&sessions, pretty)
        }
        Command::Session { id } => {
            let Some(session) = bounded(timeout, analytics.get_session_by_id(&id))
                .await
                .context("failed to look up session")?
            else {
                anyhow::bail!("No session with id {}", id);
            };
            let messages = bounded(timeout, analytics.get_session_messages(&id))
                .await
                .context("failed to load session messages")?;
            let tool_calls = bounded(timeout, analytics.get_session_tool_calls(&id))
                .await
                .context("failed to load session tool calls")?;
            print_json(
                &SessionReport {
                    session,
                    messages,
                    tool_calls,
                },
                pretty,
            )
        }
        Command::Tokens { limit } => {
            let estimates = bounded(timeout, analytics.get_token_estimates_per_session(limit))
                .await
                .context("failed to estimate tokens")?;
            print_json(&estimates, pretty)
        }
        Command::Large { min_chars, limit } => {
            let messages = bounded(timeout, analytics.get_large_messages(min_chars, limit))
                .await
                .context("failed to find large messages")?;
            print_json(&messages, pretty)
        }
    }
}
