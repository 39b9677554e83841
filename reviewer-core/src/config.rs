//! Configuration for the reviewer engine
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (PR_REVIEWER_*)
//! 3. Config file (~/.config/pr-reviewer/config.toml)
//! 4. Default values

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Which storage backend the engine runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite database file
    #[default]
    Sqlite,
    /// Process-local state, lost on exit
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Memory => "memory",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageBackend::Sqlite),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(Error::Config(format!("Unknown storage backend: {}", other))),
        }
    }
}

/// Storage-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Database file; the platform cache directory is used when unset
    pub path: Option<PathBuf>,

    /// Upper bound on pooled SQLite connections
    pub max_connections: u32,

    /// How long SQLite waits on a locked database before giving up
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: None,
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Engine-related configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on a single operation, including its transaction
    #[serde(with = "humantime_serde")]
    pub transaction_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transaction_timeout: Duration::from_secs(10),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Default tracing filter, overridden by RUST_LOG
    pub log_level: String,

    pub storage: StorageConfig,

    pub engine: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            storage: StorageConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// Overrides supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub backend: Option<StorageBackend>,
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/pr-reviewer/config.toml` on Linux
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pr-reviewer").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - PR_REVIEWER_STORAGE: `sqlite` or `memory`
    /// - PR_REVIEWER_DB_PATH: database file
    /// - PR_REVIEWER_LOG_LEVEL: default tracing filter
    /// - PR_REVIEWER_TX_TIMEOUT: operation timeout, e.g. `10s`
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(backend) = var("PR_REVIEWER_STORAGE") {
            self.storage.backend = backend.parse()?;
        }

        if let Some(path) = var("PR_REVIEWER_DB_PATH") {
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Some(level) = var("PR_REVIEWER_LOG_LEVEL") {
            self.log_level = level;
        }

        if let Some(timeout) = var("PR_REVIEWER_TX_TIMEOUT") {
            self.engine.transaction_timeout = humantime_serde::re::humantime::parse_duration(
                &timeout,
            )
            .map_err(|e| Error::Config(format!("Invalid PR_REVIEWER_TX_TIMEOUT: {}", e)))?;
        }

        Ok(self)
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: CliOverrides) -> Self {
        if let Some(backend) = overrides.backend {
            self.storage.backend = backend;
        }

        if let Some(path) = overrides.db_path {
            self.storage.path = Some(path);
        }

        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(config_path: Option<&Path>, cli: CliOverrides) -> Result<Self> {
        let base = match config_path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base.with_env_overrides()?.with_cli_overrides(cli))
    }
}
