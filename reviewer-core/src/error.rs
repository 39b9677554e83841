//! Error types for reviewer assignment

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for reviewer assignment operations
pub type Result<T> = std::result::Result<T, Error>;

/// Stable, caller-facing error code
///
/// Codes are part of the external contract: callers match on them to decide
/// whether to retry, so they never change once published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TeamExists,
    PrExists,
    PrMerged,
    NotAssigned,
    NoCandidate,
    NotFound,
    BadRequest,
    #[serde(rename = "INTERNAL_ERROR")]
    Internal,
}

impl ErrorCode {
    /// Wire representation of the code
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TeamExists => "TEAM_EXISTS",
            ErrorCode::PrExists => "PR_EXISTS",
            ErrorCode::PrMerged => "PR_MERGED",
            ErrorCode::NotAssigned => "NOT_ASSIGNED",
            ErrorCode::NoCandidate => "NO_CANDIDATE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::Internal => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for reviewer assignment operations
#[derive(Error, Debug)]
pub enum Error {
    /// Team does not exist
    #[error("team {0} not found")]
    TeamNotFound(String),

    /// User does not exist
    #[error("user {0} not found")]
    UserNotFound(String),

    /// Pull request does not exist
    #[error("PR {0} not found")]
    PrNotFound(String),

    /// Team name already taken
    #[error("team {0} already exists")]
    TeamExists(String),

    /// Pull request id already taken
    #[error("PR {0} already exists")]
    PrExists(String),

    /// Reassignment attempted on a merged pull request
    #[error("cannot reassign on merged PR {0}")]
    PrMerged(String),

    /// Reassignment target is not a reviewer of the pull request
    #[error("reviewer {user_id} is not assigned to PR {pr_id}")]
    ReviewerNotAssigned { pr_id: String, user_id: String },

    /// No eligible replacement reviewer exists
    #[error("no active replacement candidate in team {0}")]
    NoActiveCandidate(String),

    /// Request cannot be acted upon
    #[error("{0}")]
    BadRequest(String),

    /// Storage backend failure
    #[error("database {operation} failed: {message}")]
    Storage { operation: String, message: String },

    /// Operation did not finish within the transaction timeout
    #[error("{operation} timed out after {elapsed:?}")]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a backend failure for the named storage operation
    pub fn storage(operation: impl Into<String>, err: impl fmt::Display) -> Self {
        Error::Storage {
            operation: operation.into(),
            message: err.to_string(),
        }
    }

    /// Caller-facing code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::TeamNotFound(_) | Error::UserNotFound(_) | Error::PrNotFound(_) => {
                ErrorCode::NotFound
            }
            Error::TeamExists(_) => ErrorCode::TeamExists,
            Error::PrExists(_) => ErrorCode::PrExists,
            Error::PrMerged(_) => ErrorCode::PrMerged,
            Error::ReviewerNotAssigned { .. } => ErrorCode::NotAssigned,
            Error::NoActiveCandidate(_) => ErrorCode::NoCandidate,
            Error::BadRequest(_) => ErrorCode::BadRequest,
            Error::Storage { .. } | Error::Timeout { .. } | Error::Config(_) | Error::Io(_) => {
                ErrorCode::Internal
            }
        }
    }

    /// Whether this is an unexpected failure rather than a domain rule violation
    pub fn is_internal(&self) -> bool {
        self.code() == ErrorCode::Internal
    }

    /// Whether repeating the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::NoActiveCandidate(_) | Error::Storage { .. } | Error::Timeout { .. }
        )
    }

    /// Serializable error body for callers
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        }
    }
}

/// Error body returned to callers: `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}
