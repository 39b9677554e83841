//! Opening, merging, and inspecting pull requests

use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::info;

use super::candidates::{eligible, Exclusions};
use super::Engine;
use crate::model::{PullRequest, ReviewedPullRequest, User, MAX_REVIEWERS};
use crate::store::StoreTx;
use crate::{Error, Result};

impl Engine {
    /// Open a pull request and assign up to two reviewers from the author's team
    ///
    /// Reviewers are active teammates of the author, never the author. With
    /// more than two candidates a uniformly random pair is drawn.
    pub async fn create_pr(
        &self,
        pr_id: &str,
        name: &str,
        author_id: &str,
    ) -> Result<ReviewedPullRequest> {
        const OP: &str = "create_pr";

        let created = self
            .bounded(OP, async {
                let mut tx = self.begin(OP).await?;
                let result = self.create_pr_in(tx.as_mut(), pr_id, name, author_id).await;
                self.finish(OP, tx, result).await
            })
            .await?;

        info!(
            pr_id,
            author_id,
            reviewers = ?created.assigned_reviewers,
            "Pull request created"
        );
        Ok(created)
    }

    async fn create_pr_in(
        &self,
        tx: &mut dyn StoreTx,
        pr_id: &str,
        name: &str,
        author_id: &str,
    ) -> Result<ReviewedPullRequest> {
        if pr_id.is_empty() {
            return Err(Error::BadRequest("pull_request_id must not be empty".into()));
        }

        if tx.pr_exists(pr_id).await? {
            return Err(Error::PrExists(pr_id.to_string()));
        }

        let author = tx.get_user(author_id).await?;
        let team = tx.get_team(&author.team_name).await?;
        let candidates = eligible(&team, &Exclusions::of([author_id]));
        let reviewers = self.pick_initial_reviewers(candidates);

        let pr = PullRequest::open(pr_id, name, author_id);
        tx.create_pr(&pr, &reviewers).await?;

        Ok(ReviewedPullRequest::new(pr, reviewers))
    }

    /// Take every candidate when there are at most `MAX_REVIEWERS`, otherwise
    /// the head of a uniformly random permutation
    fn pick_initial_reviewers(&self, mut candidates: Vec<&User>) -> Vec<String> {
        if candidates.len() > MAX_REVIEWERS {
            self.draw(|rng| candidates.shuffle(rng));
            candidates.truncate(MAX_REVIEWERS);
        }

        candidates.into_iter().map(|u| u.user_id.clone()).collect()
    }

    /// Mark a pull request as merged
    ///
    /// Idempotent: merging an already merged PR returns its stored state,
    /// including the original merge time.
    pub async fn merge_pr(&self, pr_id: &str) -> Result<ReviewedPullRequest> {
        const OP: &str = "merge_pr";

        self.bounded(OP, async {
            let mut tx = self.begin(OP).await?;
            let result = Self::merge_pr_in(tx.as_mut(), pr_id).await;
            self.finish(OP, tx, result).await
        })
        .await
    }

    async fn merge_pr_in(tx: &mut dyn StoreTx, pr_id: &str) -> Result<ReviewedPullRequest> {
        let (pr, reviewers) = tx.get_pr_with_reviewers(pr_id).await?;
        if pr.is_merged() {
            return Ok(ReviewedPullRequest::new(pr, reviewers));
        }

        tx.merge_pr(pr_id, Utc::now()).await?;
        let (pr, reviewers) = tx.get_pr_with_reviewers(pr_id).await?;
        info!(pr_id, "Pull request merged");

        Ok(ReviewedPullRequest::new(pr, reviewers))
    }

    /// Current state of a pull request and its reviewers
    pub async fn get_pr(&self, pr_id: &str) -> Result<ReviewedPullRequest> {
        const OP: &str = "get_pr";

        self.bounded(OP, async {
            let mut tx = self.begin(OP).await?;
            let result = tx
                .get_pr_with_reviewers(pr_id)
                .await
                .map(|(pr, reviewers)| ReviewedPullRequest::new(pr, reviewers));
            self.finish(OP, tx, result).await
        })
        .await
    }
}
