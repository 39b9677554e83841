//! Mass deactivation with reviewer reconciliation
//!
//! Deactivating several team members at once invalidates their reviewer
//! assignments on every open pull request. The reconciler plans one swap per
//! removed reviewer across all affected PRs, then applies the swaps and the
//! deactivation in the same scope.

use std::collections::HashSet;

use tracing::{debug, info};

use super::candidates::{eligible, Exclusions};
use super::Engine;
use crate::model::{DeactivationReport, PullRequest, Reassignment, ReassignmentSummary, Team};
use crate::store::StoreTx;
use crate::{Error, Result};

/// Swaps computed for one deactivation batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// One record per removed reviewer, in PR order
    pub reassignments: Vec<Reassignment>,
    /// One entry per PR that lost at least one reviewer
    pub summaries: Vec<ReassignmentSummary>,
}

/// Plan reviewer swaps for the open PRs affected by deactivating `deactivating`.
///
/// Every deactivated user is a member of `team`, so `team` is also the pool
/// replacements are drawn from. For each removed reviewer the first member
/// of `team` (in team order) that is active, is not the author, is not
/// already assigned or planned for that PR, and is not being deactivated
/// becomes the replacement. When none qualifies the reviewer is dropped.
pub fn plan_reassignments(
    team: &Team,
    deactivating: &[String],
    affected: &[(PullRequest, Vec<String>)],
) -> ReconciliationPlan {
    let leaving: HashSet<&str> = deactivating.iter().map(String::as_str).collect();
    let mut plan = ReconciliationPlan::default();

    for (pr, reviewers) in affected {
        let (removed, staying): (Vec<&String>, Vec<&String>) = reviewers
            .iter()
            .partition(|id| leaving.contains(id.as_str()));

        if removed.is_empty() {
            continue;
        }

        let mut excluded = Exclusions::of([pr.author_id.as_str()]);
        excluded.extend(deactivating.iter().map(String::as_str));
        excluded.extend(staying.iter().map(|id| id.as_str()));

        let mut new_reviewers: Vec<String> = staying.iter().map(|id| id.to_string()).collect();
        let mut old_reviewers = Vec::with_capacity(removed.len());

        for old_id in removed {
            let replacement = eligible(team, &excluded)
                .first()
                .map(|user| user.user_id.clone());

            if let Some(new_id) = &replacement {
                excluded.insert(new_id.as_str());
                new_reviewers.push(new_id.clone());
            }

            debug!(
                pr_id = %pr.pull_request_id,
                old_reviewer_id = %old_id,
                new_reviewer_id = ?replacement,
                "Planned reviewer swap"
            );

            old_reviewers.push(old_id.clone());
            plan.reassignments.push(Reassignment {
                pull_request_id: pr.pull_request_id.clone(),
                old_reviewer_id: old_id.clone(),
                new_reviewer_id: replacement,
            });
        }

        plan.summaries.push(ReassignmentSummary {
            pull_request_id: pr.pull_request_id.clone(),
            old_reviewers,
            new_reviewers,
        });
    }

    plan
}

impl Engine {
    /// Deactivate a batch of team members and reconcile every open PR they review
    ///
    /// Requested ids that do not exist or belong to another team are ignored.
    /// Either every planned swap and every deactivation is applied, or none.
    pub async fn deactivate_team_users(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<DeactivationReport> {
        const OP: &str = "deactivate_team_users";

        let report = self
            .bounded(OP, async {
                let mut tx = self.begin(OP).await?;
                let result = Self::deactivate_in(tx.as_mut(), team_name, user_ids).await;
                self.finish(OP, tx, result).await
            })
            .await?;

        info!(
            team_name,
            deactivated = report.deactivated_users.len(),
            reassigned_prs = report.reassigned_prs.len(),
            "Team users deactivated"
        );
        Ok(report)
    }

    async fn deactivate_in(
        tx: &mut dyn StoreTx,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<DeactivationReport> {
        let team = tx.get_team(team_name).await?;
        let valid = valid_team_members(&team, user_ids);
        if valid.is_empty() {
            return Err(Error::BadRequest("no valid users to deactivate".into()));
        }

        let affected = tx.open_prs_with_reviewers(&valid).await?;
        let plan = plan_reassignments(&team, &valid, &affected);

        if !plan.reassignments.is_empty() {
            tx.bulk_reassign_reviewers(&plan.reassignments).await?;
        }
        tx.deactivate_users(&valid).await?;

        Ok(DeactivationReport {
            deactivated_users: valid,
            reassigned_prs: plan.summaries,
        })
    }
}

/// Requested ids that belong to `team`, deduplicated in request order
fn valid_team_members(team: &Team, user_ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    user_ids
        .iter()
        .filter(|id| team.has_member(id))
        .filter(|id| seen.insert(id.to_string()))
        .cloned()
        .collect()
}
