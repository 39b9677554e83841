//! Reviewer Core - pull request reviewer assignment and reconciliation
//!
//! This crate assigns reviewers to pull requests from the author's team,
//! replaces reviewers on demand, and keeps open pull requests staffed when
//! team members are deactivated in bulk. Persistence goes through the
//! [`Store`] port; `reviewer-db` provides the SQLite backend.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;

pub use config::{CliOverrides, Config, EngineConfig, StorageBackend, StorageConfig};
pub use engine::Engine;
pub use error::{Error, ErrorCode, ErrorResponse, Result};
pub use model::{
    DeactivationReport, PrStatus, PullRequest, PullRequestShort, ReassignOutcome, Reassignment,
    ReassignmentSummary, ReviewedPullRequest, Team, TeamMember, User, UserReviews,
};
pub use store::{InMemoryStore, Store, StoreTx};
