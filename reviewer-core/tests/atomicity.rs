//! Every engine operation commits all of its writes or none of them

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use reviewer_core::store::{Store, StoreTx};
use reviewer_core::{
    Engine, EngineConfig, Error, ErrorCode, InMemoryStore, PullRequest, Reassignment, Result, Team,
    TeamMember, User,
};

/// How the wrapped scope misbehaves when deactivating users
#[derive(Clone, Copy)]
enum Fault {
    Fail,
    Stall(Duration),
}

/// In-memory store whose `deactivate_users` misbehaves once armed
#[derive(Clone)]
struct FaultyStore {
    inner: InMemoryStore,
    fault: Option<Fault>,
}

#[async_trait]
impl Store for FaultyStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        Ok(Box::new(FaultyTx {
            inner: self.inner.begin().await?,
            fault: self.fault,
        }))
    }
}

struct FaultyTx {
    inner: Box<dyn StoreTx>,
    fault: Option<Fault>,
}

#[async_trait]
impl StoreTx for FaultyTx {
    async fn create_team(&mut self, team_name: &str, members: &[User]) -> Result<()> {
        self.inner.create_team(team_name, members).await
    }

    async fn team_exists(&mut self, team_name: &str) -> Result<bool> {
        self.inner.team_exists(team_name).await
    }

    async fn get_team(&mut self, team_name: &str) -> Result<Team> {
        self.inner.get_team(team_name).await
    }

    async fn get_user(&mut self, user_id: &str) -> Result<User> {
        self.inner.get_user(user_id).await
    }

    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<()> {
        self.inner.set_user_active(user_id, is_active).await
    }

    async fn deactivate_users(&mut self, user_ids: &[String]) -> Result<()> {
        match self.fault {
            Some(Fault::Fail) => Err(Error::storage("deactivate users", "disk I/O error")),
            Some(Fault::Stall(delay)) => {
                tokio::time::sleep(delay).await;
                self.inner.deactivate_users(user_ids).await
            }
            None => self.inner.deactivate_users(user_ids).await,
        }
    }

    async fn active_team_members(
        &mut self,
        team_name: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<Vec<User>> {
        self.inner
            .active_team_members(team_name, exclude_user_id)
            .await
    }

    async fn pr_exists(&mut self, pr_id: &str) -> Result<bool> {
        self.inner.pr_exists(pr_id).await
    }

    async fn create_pr(&mut self, pr: &PullRequest, reviewer_ids: &[String]) -> Result<()> {
        self.inner.create_pr(pr, reviewer_ids).await
    }

    async fn merge_pr(&mut self, pr_id: &str, merged_at: DateTime<Utc>) -> Result<()> {
        self.inner.merge_pr(pr_id, merged_at).await
    }

    async fn get_pr_with_reviewers(&mut self, pr_id: &str) -> Result<(PullRequest, Vec<String>)> {
        self.inner.get_pr_with_reviewers(pr_id).await
    }

    async fn is_reviewer_assigned(&mut self, pr_id: &str, user_id: &str) -> Result<bool> {
        self.inner.is_reviewer_assigned(pr_id, user_id).await
    }

    async fn add_reviewer(&mut self, pr_id: &str, user_id: &str) -> Result<()> {
        self.inner.add_reviewer(pr_id, user_id).await
    }

    async fn remove_reviewer(&mut self, pr_id: &str, user_id: &str) -> Result<()> {
        self.inner.remove_reviewer(pr_id, user_id).await
    }

    async fn user_reviews(&mut self, user_id: &str) -> Result<Vec<PullRequest>> {
        self.inner.user_reviews(user_id).await
    }

    async fn open_prs_with_reviewers(
        &mut self,
        reviewer_ids: &[String],
    ) -> Result<Vec<(PullRequest, Vec<String>)>> {
        self.inner.open_prs_with_reviewers(reviewer_ids).await
    }

    async fn bulk_reassign_reviewers(&mut self, reassignments: &[Reassignment]) -> Result<()> {
        self.inner.bulk_reassign_reviewers(reassignments).await
    }

    async fn assignment_stats(&mut self) -> Result<BTreeMap<String, u64>> {
        self.inner.assignment_stats().await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.inner.rollback().await
    }
}

fn members(ids: &[&str]) -> Vec<TeamMember> {
    ids.iter().map(|id| TeamMember::new(*id, *id)).collect()
}

/// Seed a five-member team with one open PR through a healthy engine
async fn seeded() -> (InMemoryStore, Vec<String>) {
    let inner = InMemoryStore::new();
    let engine = Engine::new(Arc::new(inner.clone())).with_rng(StdRng::seed_from_u64(17));
    engine
        .create_team("backend", members(&["u1", "u2", "u3", "u4", "u5"]))
        .await
        .unwrap();
    let pr = engine.create_pr("pr-1", "x", "u1").await.unwrap();
    (inner, pr.assigned_reviewers)
}

fn faulty_engine(inner: &InMemoryStore, fault: Fault, timeout: Duration) -> Engine {
    let store = FaultyStore {
        inner: inner.clone(),
        fault: Some(fault),
    };
    Engine::new(Arc::new(store)).with_config(&EngineConfig {
        transaction_timeout: timeout,
    })
}

async fn assert_untouched(inner: &InMemoryStore, reviewers: &[String]) {
    let engine = Engine::new(Arc::new(inner.clone()));

    let pr = engine.get_pr("pr-1").await.unwrap();
    assert_eq!(pr.assigned_reviewers, reviewers);

    let team = engine.get_team("backend").await.unwrap();
    assert!(team.members.iter().all(|m| m.is_active));
}

#[tokio::test]
async fn test_failed_deactivation_rolls_back_swaps() {
    let (inner, reviewers) = seeded().await;
    let engine = faulty_engine(&inner, Fault::Fail, Duration::from_secs(5));

    let err = engine
        .deactivate_team_users("backend", &reviewers)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Internal);
    assert!(err.is_retryable());

    assert_untouched(&inner, &reviewers).await;
}

#[tokio::test]
async fn test_timed_out_deactivation_rolls_back_swaps() {
    let (inner, reviewers) = seeded().await;
    let engine = faulty_engine(
        &inner,
        Fault::Stall(Duration::from_millis(500)),
        Duration::from_millis(20),
    );

    let err = engine
        .deactivate_team_users("backend", &reviewers)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));

    // The abandoned scope released the store, so this does not hang.
    assert_untouched(&inner, &reviewers).await;
}

#[tokio::test]
async fn test_rejected_operation_leaves_store_usable() {
    let (inner, reviewers) = seeded().await;
    let engine = Engine::new(Arc::new(inner.clone()));

    let err = engine.reassign_reviewer("pr-1", "u1").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotAssigned);

    let body = serde_json::to_value(err.to_response()).unwrap();
    assert_eq!(body["error"]["code"], "NOT_ASSIGNED");

    assert_untouched(&inner, &reviewers).await;
}
