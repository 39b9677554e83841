//! Domain records for teams, users, and pull requests

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Maximum number of reviewers picked when a pull request is opened
pub const MAX_REVIEWERS: usize = 2;

/// A team member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

/// Member entry supplied when a team is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl TeamMember {
    /// Create an active member
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            is_active: true,
        }
    }

    /// Set the initial activity flag
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Bind this member to a team
    pub fn into_user(self, team_name: &str) -> User {
        User {
            user_id: self.user_id,
            username: self.username,
            team_name: team_name.to_string(),
            is_active: self.is_active,
        }
    }
}

/// A team and its members, ordered by user id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub team_name: String,
    pub members: Vec<User>,
}

impl Team {
    /// Whether the given user belongs to this team
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }
}

/// Pull request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    Open,
    Merged,
}

impl PrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "OPEN",
            PrStatus::Merged => "MERGED",
        }
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(PrStatus::Open),
            "MERGED" => Ok(PrStatus::Merged),
            other => Err(Error::storage(
                "decode PR status",
                format!("unknown status {:?}", other),
            )),
        }
    }
}

/// A pull request record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PrStatus,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "mergedAt", skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    /// Create an open pull request stamped with the current time
    pub fn open(
        pull_request_id: impl Into<String>,
        pull_request_name: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Self {
        Self {
            pull_request_id: pull_request_id.into(),
            pull_request_name: pull_request_name.into(),
            author_id: author_id.into(),
            status: PrStatus::Open,
            created_at: Utc::now(),
            merged_at: None,
        }
    }

    pub fn is_merged(&self) -> bool {
        self.status == PrStatus::Merged
    }
}

/// A pull request together with its assigned reviewers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewedPullRequest {
    #[serde(flatten)]
    pub pull_request: PullRequest,
    pub assigned_reviewers: Vec<String>,
}

impl ReviewedPullRequest {
    pub fn new(pull_request: PullRequest, assigned_reviewers: Vec<String>) -> Self {
        Self {
            pull_request,
            assigned_reviewers,
        }
    }
}

/// Abbreviated pull request listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestShort {
    pub pull_request_id: String,
    pub pull_request_name: String,
    pub author_id: String,
    pub status: PrStatus,
}

impl From<PullRequest> for PullRequestShort {
    fn from(pr: PullRequest) -> Self {
        Self {
            pull_request_id: pr.pull_request_id,
            pull_request_name: pr.pull_request_name,
            author_id: pr.author_id,
            status: pr.status,
        }
    }
}

/// Pull requests a user is assigned to review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReviews {
    pub user_id: String,
    pub pull_requests: Vec<PullRequestShort>,
}

/// Outcome of a single reviewer replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignOutcome {
    pub pr: ReviewedPullRequest,
    pub replaced_by: String,
}

/// One planned reviewer swap; `new_reviewer_id` is `None` when the old
/// reviewer is dropped without a replacement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reassignment {
    pub pull_request_id: String,
    pub old_reviewer_id: String,
    pub new_reviewer_id: Option<String>,
}

/// Per-PR view of a mass deactivation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentSummary {
    pub pull_request_id: String,
    /// Reviewers removed because they were deactivated
    pub old_reviewers: Vec<String>,
    /// Full reviewer list after the swap
    pub new_reviewers: Vec<String>,
}

/// Result of deactivating a batch of team members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivationReport {
    pub deactivated_users: Vec<String>,
    pub reassigned_prs: Vec<ReassignmentSummary>,
}
