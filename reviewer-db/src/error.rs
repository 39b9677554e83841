//! Error types for database setup

use thiserror::Error;

/// Database error types
#[derive(Error, Debug)]
pub enum Error {
    /// SQLx database error
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for reviewer_core::Error {
    fn from(err: Error) -> Self {
        reviewer_core::Error::storage("open database", err)
    }
}
