//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/sessionlens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/sessionlens/` (~/.config/sessionlens/)
//! - Data: `$XDG_DATA_HOME/sessionlens/` (~/.local/share/sessionlens/)
//! - State/Logs: `$XDG_STATE_HOME/sessionlens/` (~/.local/state/sessionlens/)

use crate::error::{Error, Result};
use crate::types::Relation;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Snapshot locations
    #[serde(default)]
    pub datasets: DatasetsConfig,

    /// Engine bring-up options
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the three Parquet snapshots live.
///
/// `base` is either a directory or a URL prefix; each relation reads
/// `<base>/<relation>.parquet` unless overridden.
#[derive(Debug, Deserialize, Clone)]
pub struct DatasetsConfig {
    #[serde(default = "default_dataset_base")]
    pub base: String,

    pub sessions: Option<String>,
    pub messages: Option<String>,
    pub tool_calls: Option<String>,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            base: default_dataset_base(),
            sessions: None,
            messages: None,
            tool_calls: None,
        }
    }
}

fn default_dataset_base() -> String {
    Config::data_dir().join("data").to_string_lossy().into_owned()
}

impl DatasetsConfig {
    /// All snapshots under one base directory or URL prefix.
    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            ..Default::default()
        }
    }

    /// Resolved location for a relation's snapshot.
    pub fn location(&self, relation: Relation) -> String {
        let override_location = match relation {
            Relation::Sessions => &self.sessions,
            Relation::Messages => &self.messages,
            Relation::ToolCalls => &self.tool_calls,
        };
        if let Some(location) = override_location {
            return location.clone();
        }

        if is_remote(&self.base) {
            format!("{}/{}", self.base.trim_end_matches('/'), relation.file_name())
        } else {
            Path::new(&self.base)
                .join(relation.file_name())
                .to_string_lossy()
                .into_owned()
        }
    }

    /// True if any snapshot must be fetched over the network.
    pub fn has_remote(&self) -> bool {
        Relation::ALL
            .iter()
            .any(|relation| is_remote(&self.location(*relation)))
    }
}

/// True for locations DuckDB reads through `httpfs`.
pub fn is_remote(location: &str) -> bool {
    ["http://", "https://", "s3://"]
        .iter()
        .any(|scheme| location.starts_with(scheme))
}

/// Engine bring-up options
#[derive(Debug, Deserialize, Default, Clone)]
pub struct EngineConfig {
    /// Database file; in-memory when unset
    pub database: Option<PathBuf>,

    /// Worker threads used by the engine
    pub threads: Option<u32>,

    /// Memory limit, e.g. "1GB"
    pub memory_limit: Option<String>,

    /// Client-side timeout applied by consumers, in seconds
    pub query_timeout_secs: Option<u64>,
}

impl EngineConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.threads == Some(0) {
            return Err(Error::Config(
                "engine.threads must be at least 1".to_string(),
            ));
        }
        if let Some(limit) = &self.memory_limit {
            if limit.trim().is_empty() {
                return Err(Error::Config(
                    "engine.memory_limit must not be empty".to_string(),
                ));
            }
        }
        if self.query_timeout_secs == Some(0) {
            return Err(Error::Config(
                "engine.query_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.engine.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/sessionlens/config.toml` (~/.config/sessionlens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("sessionlens").join("config.toml")
    }

    /// Returns the data directory path (default snapshot location)
    ///
    /// `$XDG_DATA_HOME/sessionlens/` (~/.local/share/sessionlens/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("sessionlens")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/sessionlens/` (~/.local/state/sessionlens/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("sessionlens")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/sessionlens/sessionlens.log` (~/.local/state/sessionlens/sessionlens.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("sessionlens.log")
    }
}
