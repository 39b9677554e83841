//! Row types for database records

use chrono::{DateTime, Utc};
use reviewer_core::{PullRequest, Result, User};

/// Row of the `users` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct UserRow {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            user_id: row.user_id,
            username: row.username,
            team_name: row.team_name,
            is_active: row.is_active,
        }
    }
}

/// Row of the `pull_requests` table
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PullRequestRow {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequestRow {
    /// Convert to the domain record; fails on an unknown status value
    pub fn into_pull_request(self) -> Result<PullRequest> {
        Ok(PullRequest {
            status: self.status.parse()?,
            pull_request_id: self.pull_request_id,
            pull_request_name: self.pull_request_name,
            author_id: self.author_id,
            created_at: self.created_at,
            merged_at: self.merged_at,
        })
    }
}
