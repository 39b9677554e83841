//! Database layer for the reviewer engine
//!
//! Provides SQLite persistence for teams, users, pull requests, and reviewer
//! assignments behind the `reviewer_core::Store` port.

pub mod error;
mod models;
mod store;

use std::path::{Path, PathBuf};

use reviewer_core::StorageConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::info;

pub use error::{Error, Result};
pub use store::SqliteStore;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file and run migrations
    pub async fn new(db_path: impl AsRef<Path>, config: &StorageConfig) -> Result<Self> {
        let db_path = db_path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Io(format!("Failed to create database directory: {}", e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!(path = %db_path.display(), "Database ready");
        Ok(Self { pool })
    }

    /// Open the database at the configured path, or the default path
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let path = match &config.path {
            Some(path) => path.clone(),
            None => Self::default_path()?,
        };
        Self::new(path, config).await
    }

    /// Get the default database path (~/.cache/pr-reviewer/pr-reviewer.db)
    pub fn default_path() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| Error::Io("Could not determine cache directory".to_string()))?;
        Ok(cache_dir.join("pr-reviewer").join("pr-reviewer.db"))
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Store handing out transactional scopes over this database
    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(self.pool.clone())
    }
}
