//! Storage port consumed by the engine.
//!
//! `Store` hands out transactional scopes; every read and write the engine
//! performs for one operation goes through a single `StoreTx`. A scope is
//! finished with `commit` or `rollback`; dropping it without committing
//! discards its writes.
//!
//! Backends: [`InMemoryStore`] here, and the SQLite store in `reviewer-db`.

mod memory;

pub use memory::InMemoryStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{PullRequest, Reassignment, Team, User};
use crate::Result;

/// Factory for transactional scopes
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a new transactional scope
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// Operations available inside one transactional scope.
///
/// Lookups that fail because a record is absent return the matching
/// `*NotFound` error; backend failures are reported as `Error::Storage`.
#[async_trait]
pub trait StoreTx: Send {
    // Teams

    /// Create a team and upsert its members. Fails with `TeamExists`.
    async fn create_team(&mut self, team_name: &str, members: &[User]) -> Result<()>;

    async fn team_exists(&mut self, team_name: &str) -> Result<bool>;

    /// Team with its members ordered by user id
    async fn get_team(&mut self, team_name: &str) -> Result<Team>;

    // Users

    async fn get_user(&mut self, user_id: &str) -> Result<User>;

    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<()>;

    /// Clear the activity flag of every listed user
    async fn deactivate_users(&mut self, user_ids: &[String]) -> Result<()>;

    /// Active members of a team ordered by user id, minus `exclude_user_id`
    async fn active_team_members(
        &mut self,
        team_name: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<Vec<User>>;

    // Pull requests

    async fn pr_exists(&mut self, pr_id: &str) -> Result<bool>;

    /// Insert an open pull request with its reviewers. Fails with `PrExists`.
    async fn create_pr(&mut self, pr: &PullRequest, reviewer_ids: &[String]) -> Result<()>;

    async fn merge_pr(&mut self, pr_id: &str, merged_at: DateTime<Utc>) -> Result<()>;

    /// Pull request and its reviewers in assignment order
    async fn get_pr_with_reviewers(&mut self, pr_id: &str) -> Result<(PullRequest, Vec<String>)>;

    // Reviewers

    async fn is_reviewer_assigned(&mut self, pr_id: &str, user_id: &str) -> Result<bool>;

    async fn add_reviewer(&mut self, pr_id: &str, user_id: &str) -> Result<()>;

    async fn remove_reviewer(&mut self, pr_id: &str, user_id: &str) -> Result<()>;

    /// Pull requests the user is assigned to review
    async fn user_reviews(&mut self, user_id: &str) -> Result<Vec<PullRequest>>;

    /// Open pull requests with at least one reviewer among `reviewer_ids`,
    /// each with its full reviewer list
    async fn open_prs_with_reviewers(
        &mut self,
        reviewer_ids: &[String],
    ) -> Result<Vec<(PullRequest, Vec<String>)>>;

    /// Apply reviewer swaps: drop each old reviewer, then add the new one
    /// unless absent or already assigned
    async fn bulk_reassign_reviewers(&mut self, reassignments: &[Reassignment]) -> Result<()>;

    /// Number of PR assignments per reviewer
    async fn assignment_stats(&mut self) -> Result<BTreeMap<String, u64>>;

    // Scope

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
