//! Replacing a single reviewer on an open pull request

use rand::seq::SliceRandom;
use tracing::info;

use super::candidates::{candidates_for, Exclusions};
use super::Engine;
use crate::model::{ReassignOutcome, ReviewedPullRequest, User};
use crate::store::StoreTx;
use crate::{Error, Result};

impl Engine {
    /// Replace `old_reviewer_id` on `pr_id` with a random active teammate of
    /// the old reviewer
    ///
    /// Checks, in order: the PR exists, it is still open, and the old
    /// reviewer is actually assigned. The replacement is never the author
    /// and never someone already reviewing. When nobody qualifies the call
    /// fails with `NoActiveCandidate` and the PR is left untouched.
    pub async fn reassign_reviewer(
        &self,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<ReassignOutcome> {
        const OP: &str = "reassign_reviewer";

        let outcome = self
            .bounded(OP, async {
                let mut tx = self.begin(OP).await?;
                let result = self.reassign_in(tx.as_mut(), pr_id, old_reviewer_id).await;
                self.finish(OP, tx, result).await
            })
            .await?;

        info!(
            pr_id,
            old_reviewer_id,
            new_reviewer_id = %outcome.replaced_by,
            "Reviewer reassigned"
        );
        Ok(outcome)
    }

    async fn reassign_in(
        &self,
        tx: &mut dyn StoreTx,
        pr_id: &str,
        old_reviewer_id: &str,
    ) -> Result<ReassignOutcome> {
        let (pr, reviewers) = tx.get_pr_with_reviewers(pr_id).await?;

        if pr.is_merged() {
            return Err(Error::PrMerged(pr_id.to_string()));
        }

        if !tx.is_reviewer_assigned(pr_id, old_reviewer_id).await? {
            return Err(Error::ReviewerNotAssigned {
                pr_id: pr_id.to_string(),
                user_id: old_reviewer_id.to_string(),
            });
        }

        let old_reviewer = tx.get_user(old_reviewer_id).await?;

        // The old reviewer is among `reviewers`, so it is excluded as well.
        let mut excluded = Exclusions::of([pr.author_id.as_str()]);
        excluded.extend(reviewers.iter().map(String::as_str));

        let candidates = candidates_for(tx, &old_reviewer.team_name, &excluded).await?;
        let replacement = self
            .pick_replacement(&candidates)
            .ok_or_else(|| Error::NoActiveCandidate(old_reviewer.team_name.clone()))?;

        tx.remove_reviewer(pr_id, old_reviewer_id).await?;
        tx.add_reviewer(pr_id, &replacement).await?;

        let (pr, reviewers) = tx.get_pr_with_reviewers(pr_id).await?;
        Ok(ReassignOutcome {
            pr: ReviewedPullRequest::new(pr, reviewers),
            replaced_by: replacement,
        })
    }

    /// Uniformly random candidate, or `None` when the pool is empty
    fn pick_replacement(&self, candidates: &[User]) -> Option<String> {
        self.draw(|rng| candidates.choose(rng).map(|u| u.user_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::engine::test_support::{engine, members};
    use crate::model::TeamMember;
    use crate::Error;

    #[tokio::test]
    async fn test_replacement_is_fresh_teammate() {
        for seed in 0..20 {
            let (engine, _) = engine(seed);
            engine
                .create_team("backend", members(&["u1", "u2", "u3", "u4", "u5"]))
                .await
                .unwrap();
            let pr = engine.create_pr("pr-1", "x", "u1").await.unwrap();
            let before = pr.assigned_reviewers.clone();
            let old = before[0].clone();

            let outcome = engine.reassign_reviewer("pr-1", &old).await.unwrap();
            let after = &outcome.pr.assigned_reviewers;

            assert!(!after.contains(&old));
            assert_eq!(after.iter().filter(|r| **r == outcome.replaced_by).count(), 1);
            assert_ne!(outcome.replaced_by, "u1");
            assert!(!before.contains(&outcome.replaced_by));
            assert_eq!(after.len(), before.len());
        }
    }

    #[tokio::test]
    async fn test_merged_pr_is_frozen() {
        let (engine, _) = engine(3);
        engine
            .create_team("backend", members(&["u1", "u2", "u3", "u4"]))
            .await
            .unwrap();
        let pr = engine.create_pr("pr-1", "x", "u1").await.unwrap();
        engine.merge_pr("pr-1").await.unwrap();

        let old = &pr.assigned_reviewers[0];
        let err = engine.reassign_reviewer("pr-1", old).await.unwrap_err();
        assert!(matches!(err, Error::PrMerged(_)));

        let after = engine.get_pr("pr-1").await.unwrap();
        assert_eq!(after.assigned_reviewers, pr.assigned_reviewers);
    }

    #[tokio::test]
    async fn test_unassigned_reviewer_rejected() {
        let (engine, _) = engine(3);
        engine
            .create_team("backend", members(&["u1", "u2", "u3", "u4"]))
            .await
            .unwrap();
        let pr = engine.create_pr("pr-1", "x", "u1").await.unwrap();

        let err = engine.reassign_reviewer("pr-1", "u1").await.unwrap_err();
        assert!(matches!(err, Error::ReviewerNotAssigned { .. }));

        let after = engine.get_pr("pr-1").await.unwrap();
        assert_eq!(after.assigned_reviewers, pr.assigned_reviewers);
    }

    #[tokio::test]
    async fn test_missing_pr() {
        let (engine, _) = engine(3);
        let err = engine.reassign_reviewer("nope", "u1").await.unwrap_err();
        assert!(matches!(err, Error::PrNotFound(_)));
    }

    #[tokio::test]
    async fn test_no_candidate_leaves_reviewers_unchanged() {
        let (engine, _) = engine(3);
        engine
            .create_team("backend", members(&["u1", "u2", "u3"]))
            .await
            .unwrap();
        let pr = engine.create_pr("pr-1", "x", "u1").await.unwrap();

        let err = engine.reassign_reviewer("pr-1", "u2").await.unwrap_err();
        assert!(matches!(err, Error::NoActiveCandidate(ref team) if team == "backend"));

        let after = engine.get_pr("pr-1").await.unwrap();
        assert_eq!(after.assigned_reviewers, pr.assigned_reviewers);
    }

    #[tokio::test]
    async fn test_inactive_teammate_not_picked() {
        let (engine, _) = engine(3);
        engine
            .create_team(
                "backend",
                vec![
                    TeamMember::new("u1", "Alice"),
                    TeamMember::new("u2", "Bob"),
                    TeamMember::new("u3", "Carol"),
                    TeamMember::new("u4", "Dave"),
                ],
            )
            .await
            .unwrap();
        let pr = engine.create_pr("pr-1", "x", "u1").await.unwrap();

        let spare: Vec<_> = ["u2", "u3", "u4"]
            .into_iter()
            .filter(|id| !pr.assigned_reviewers.iter().any(|r| r == *id))
            .collect();
        assert_eq!(spare.len(), 1);
        engine.set_user_active(spare[0], false).await.unwrap();

        let err = engine
            .reassign_reviewer("pr-1", &pr.assigned_reviewers[0])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoActiveCandidate(_)));
    }

    #[tokio::test]
    async fn test_repeated_reassignment_rereads_state() {
        let (engine, _) = engine(11);
        engine
            .create_team("backend", members(&["u1", "u2", "u3", "u4", "u5", "u6"]))
            .await
            .unwrap();
        engine.create_pr("pr-1", "x", "u1").await.unwrap();

        for _ in 0..6 {
            let current = engine.get_pr("pr-1").await.unwrap().assigned_reviewers;
            let outcome = engine.reassign_reviewer("pr-1", &current[0]).await.unwrap();

            let unique: HashSet<_> = outcome.pr.assigned_reviewers.iter().collect();
            assert_eq!(unique.len(), 2);
            assert!(!outcome.pr.assigned_reviewers.contains(&"u1".to_string()));
        }
    }
}
