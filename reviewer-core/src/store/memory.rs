//! In-memory implementation of `Store`.
//!
//! All state lives in a single map set behind an async mutex. A scope holds
//! the mutex for its whole lifetime and works on a private copy, so scopes
//! are fully serialized and a commit swaps the copy in. State is lost when
//! the store is dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreTx};
use crate::model::{PrStatus, PullRequest, Reassignment, Team, User};
use crate::{Error, Result};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    teams: BTreeSet<String>,
    users: BTreeMap<String, User>,
    prs: BTreeMap<String, PullRequest>,
    /// Reviewer ids per PR, in assignment order
    reviewers: BTreeMap<String, Vec<String>>,
}

/// In-memory store, cheap to clone; clones share the same state
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }
}

/// Scope over the in-memory state
struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTx {
    fn members_of(&self, team_name: &str) -> impl Iterator<Item = &User> {
        let team_name = team_name.to_string();
        self.working
            .users
            .values()
            .filter(move |u| u.team_name == team_name)
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn create_team(&mut self, team_name: &str, members: &[User]) -> Result<()> {
        if !self.working.teams.insert(team_name.to_string()) {
            return Err(Error::TeamExists(team_name.to_string()));
        }

        for member in members {
            let mut user = member.clone();
            user.team_name = team_name.to_string();
            self.working.users.insert(user.user_id.clone(), user);
        }

        Ok(())
    }

    async fn team_exists(&mut self, team_name: &str) -> Result<bool> {
        Ok(self.working.teams.contains(team_name))
    }

    async fn get_team(&mut self, team_name: &str) -> Result<Team> {
        if !self.working.teams.contains(team_name) {
            return Err(Error::TeamNotFound(team_name.to_string()));
        }

        Ok(Team {
            team_name: team_name.to_string(),
            members: self.members_of(team_name).cloned().collect(),
        })
    }

    async fn get_user(&mut self, user_id: &str) -> Result<User> {
        self.working
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<()> {
        let user = self
            .working
            .users
            .get_mut(user_id)
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;
        user.is_active = is_active;
        Ok(())
    }

    async fn deactivate_users(&mut self, user_ids: &[String]) -> Result<()> {
        for user_id in user_ids {
            if let Some(user) = self.working.users.get_mut(user_id) {
                user.is_active = false;
            }
        }
        Ok(())
    }

    async fn active_team_members(
        &mut self,
        team_name: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<Vec<User>> {
        Ok(self
            .members_of(team_name)
            .filter(|u| u.is_active && Some(u.user_id.as_str()) != exclude_user_id)
            .cloned()
            .collect())
    }

    async fn pr_exists(&mut self, pr_id: &str) -> Result<bool> {
        Ok(self.working.prs.contains_key(pr_id))
    }

    async fn create_pr(&mut self, pr: &PullRequest, reviewer_ids: &[String]) -> Result<()> {
        if self.working.prs.contains_key(&pr.pull_request_id) {
            return Err(Error::PrExists(pr.pull_request_id.clone()));
        }

        self.working
            .prs
            .insert(pr.pull_request_id.clone(), pr.clone());
        self.working
            .reviewers
            .insert(pr.pull_request_id.clone(), reviewer_ids.to_vec());
        Ok(())
    }

    async fn merge_pr(&mut self, pr_id: &str, merged_at: DateTime<Utc>) -> Result<()> {
        let pr = self
            .working
            .prs
            .get_mut(pr_id)
            .ok_or_else(|| Error::PrNotFound(pr_id.to_string()))?;
        pr.status = PrStatus::Merged;
        pr.merged_at = Some(merged_at);
        Ok(())
    }

    async fn get_pr_with_reviewers(&mut self, pr_id: &str) -> Result<(PullRequest, Vec<String>)> {
        let pr = self
            .working
            .prs
            .get(pr_id)
            .cloned()
            .ok_or_else(|| Error::PrNotFound(pr_id.to_string()))?;
        let reviewers = self
            .working
            .reviewers
            .get(pr_id)
            .cloned()
            .unwrap_or_default();
        Ok((pr, reviewers))
    }

    async fn is_reviewer_assigned(&mut self, pr_id: &str, user_id: &str) -> Result<bool> {
        Ok(self
            .working
            .reviewers
            .get(pr_id)
            .is_some_and(|reviewers| reviewers.iter().any(|r| r == user_id)))
    }

    async fn add_reviewer(&mut self, pr_id: &str, user_id: &str) -> Result<()> {
        let reviewers = self.working.reviewers.entry(pr_id.to_string()).or_default();
        if !reviewers.iter().any(|r| r == user_id) {
            reviewers.push(user_id.to_string());
        }
        Ok(())
    }

    async fn remove_reviewer(&mut self, pr_id: &str, user_id: &str) -> Result<()> {
        if let Some(reviewers) = self.working.reviewers.get_mut(pr_id) {
            reviewers.retain(|r| r != user_id);
        }
        Ok(())
    }

    async fn user_reviews(&mut self, user_id: &str) -> Result<Vec<PullRequest>> {
        Ok(self
            .working
            .reviewers
            .iter()
            .filter(|(_, reviewers)| reviewers.iter().any(|r| r == user_id))
            .filter_map(|(pr_id, _)| self.working.prs.get(pr_id).cloned())
            .collect())
    }

    async fn open_prs_with_reviewers(
        &mut self,
        reviewer_ids: &[String],
    ) -> Result<Vec<(PullRequest, Vec<String>)>> {
        let wanted: BTreeSet<&str> = reviewer_ids.iter().map(String::as_str).collect();

        Ok(self
            .working
            .prs
            .values()
            .filter(|pr| pr.status == PrStatus::Open)
            .filter_map(|pr| {
                let reviewers = self.working.reviewers.get(&pr.pull_request_id)?;
                reviewers
                    .iter()
                    .any(|r| wanted.contains(r.as_str()))
                    .then(|| (pr.clone(), reviewers.clone()))
            })
            .collect())
    }

    async fn bulk_reassign_reviewers(&mut self, reassignments: &[Reassignment]) -> Result<()> {
        for swap in reassignments {
            let reviewers = self
                .working
                .reviewers
                .entry(swap.pull_request_id.clone())
                .or_default();
            reviewers.retain(|r| *r != swap.old_reviewer_id);

            if let Some(new_id) = &swap.new_reviewer_id {
                if !reviewers.contains(new_id) {
                    reviewers.push(new_id.clone());
                }
            }
        }
        Ok(())
    }

    async fn assignment_stats(&mut self) -> Result<BTreeMap<String, u64>> {
        let mut stats = BTreeMap::new();
        for reviewer_id in self.working.reviewers.values().flatten() {
            *stats.entry(reviewer_id.clone()).or_insert(0) += 1;
        }
        Ok(stats)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
