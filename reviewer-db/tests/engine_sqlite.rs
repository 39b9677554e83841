//! Engine scenarios against a real SQLite file

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use reviewer_core::{Engine, Error, ErrorCode, PrStatus, StorageConfig, TeamMember};
use reviewer_db::Database;
use tempfile::TempDir;

async fn engine(seed: u64) -> (Engine, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = Database::new(temp_dir.path().join("reviews.db"), &StorageConfig::default())
        .await
        .unwrap();
    let engine = Engine::new(Arc::new(db.store())).with_rng(StdRng::seed_from_u64(seed));
    (engine, temp_dir)
}

fn members(ids: &[&str]) -> Vec<TeamMember> {
    ids.iter().map(|id| TeamMember::new(*id, *id)).collect()
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[tokio::test]
async fn test_assignment_reassignment_and_merge() {
    let (engine, _dir) = engine(42).await;
    engine
        .create_team("backend", members(&["u1", "u2", "u3", "u4"]))
        .await
        .unwrap();

    let pr = engine.create_pr("pr-1", "Add search", "u1").await.unwrap();
    assert_eq!(pr.assigned_reviewers.len(), 2);
    assert!(!pr.assigned_reviewers.contains(&"u1".to_string()));

    let old = pr.assigned_reviewers[0].clone();
    let outcome = engine.reassign_reviewer("pr-1", &old).await.unwrap();
    let unique: HashSet<_> = outcome.pr.assigned_reviewers.iter().collect();
    assert_eq!(unique.len(), 2);
    assert!(!outcome.pr.assigned_reviewers.contains(&old));

    let merged = engine.merge_pr("pr-1").await.unwrap();
    assert_eq!(merged.pull_request.status, PrStatus::Merged);
    assert_eq!(engine.merge_pr("pr-1").await.unwrap(), merged);

    let err = engine
        .reassign_reviewer("pr-1", &outcome.replaced_by)
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::PrMerged);
}

#[tokio::test]
async fn test_conflicts_map_to_codes() {
    let (engine, _dir) = engine(1).await;
    engine
        .create_team("backend", members(&["u1", "u2"]))
        .await
        .unwrap();
    engine.create_pr("pr-1", "x", "u1").await.unwrap();

    let err = engine
        .create_team("backend", members(&["u9"]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::TeamExists);

    let err = engine.create_pr("pr-1", "y", "u2").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PrExists);

    let err = engine.create_pr("pr-2", "y", "ghost").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn test_mass_deactivation_without_replacements() {
    let (engine, _dir) = engine(3).await;
    engine
        .create_team("backend", members(&["u1", "u2", "u3"]))
        .await
        .unwrap();
    engine.create_pr("pr-1", "x", "u1").await.unwrap();

    let report = engine
        .deactivate_team_users("backend", &ids(&["u2", "u3"]))
        .await
        .unwrap();

    assert_eq!(report.deactivated_users, ids(&["u2", "u3"]));
    assert_eq!(report.reassigned_prs.len(), 1);
    assert!(report.reassigned_prs[0].new_reviewers.is_empty());

    let pr = engine.get_pr("pr-1").await.unwrap();
    assert!(pr.assigned_reviewers.is_empty());

    let team = engine.get_team("backend").await.unwrap();
    assert!(team.members.iter().all(|m| m.is_active == (m.user_id == "u1")));
}

#[tokio::test]
async fn test_mass_deactivation_picks_first_candidate() {
    let (engine, _dir) = engine(3).await;
    engine
        .create_team(
            "backend",
            vec![
                TeamMember::new("u1", "Alice"),
                TeamMember::new("u2", "Bob"),
                TeamMember::new("u3", "Carol"),
                TeamMember::new("u4", "Dave").with_active(false),
                TeamMember::new("u5", "Erin").with_active(false),
            ],
        )
        .await
        .unwrap();
    engine.create_pr("pr-1", "x", "u1").await.unwrap();
    engine.set_user_active("u4", true).await.unwrap();
    engine.set_user_active("u5", true).await.unwrap();

    let report = engine
        .deactivate_team_users("backend", &ids(&["u2", "u2", "ghost"]))
        .await
        .unwrap();

    assert_eq!(report.deactivated_users, ids(&["u2"]));
    assert_eq!(report.reassigned_prs[0].old_reviewers, ids(&["u2"]));
    assert_eq!(report.reassigned_prs[0].new_reviewers, ids(&["u3", "u4"]));

    let pr = engine.get_pr("pr-1").await.unwrap();
    assert_eq!(pr.assigned_reviewers, ids(&["u3", "u4"]));

    let stats = engine.assignment_stats().await.unwrap();
    assert_eq!(stats.get("u2"), None);
    assert_eq!(stats.get("u4"), Some(&1));
}

#[tokio::test]
async fn test_user_reviews_across_statuses() {
    let (engine, _dir) = engine(9).await;
    engine
        .create_team("backend", members(&["u1", "u2"]))
        .await
        .unwrap();
    engine.create_pr("pr-1", "a", "u1").await.unwrap();
    engine.create_pr("pr-2", "b", "u1").await.unwrap();
    engine.merge_pr("pr-1").await.unwrap();

    let reviews = engine.user_reviews("u2").await.unwrap();
    let statuses: Vec<_> = reviews
        .pull_requests
        .iter()
        .map(|pr| (pr.pull_request_id.as_str(), pr.status))
        .collect();
    assert_eq!(
        statuses,
        vec![("pr-1", PrStatus::Merged), ("pr-2", PrStatus::Open)]
    );

    assert!(matches!(
        engine.user_reviews("ghost").await,
        Err(Error::UserNotFound(_))
    ));
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("reviews.db");
    let config = StorageConfig::default();

    {
        let db = Database::new(&path, &config).await.unwrap();
        let engine = Engine::new(Arc::new(db.store()));
        engine
            .create_team("backend", members(&["u1", "u2"]))
            .await
            .unwrap();
        engine.create_pr("pr-1", "x", "u1").await.unwrap();
        db.pool().close().await;
    }

    let db = Database::new(&path, &config).await.unwrap();
    let engine = Engine::new(Arc::new(db.store()));
    let pr = engine.get_pr("pr-1").await.unwrap();
    assert_eq!(pr.assigned_reviewers, ids(&["u2"]));
}
