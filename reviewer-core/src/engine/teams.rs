//! Team and user bookkeeping

use std::collections::{BTreeMap, HashSet};

use tracing::info;

use super::Engine;
use crate::model::{PullRequestShort, Team, TeamMember, User, UserReviews};
use crate::store::StoreTx;
use crate::{Error, Result};

impl Engine {
    /// Create a team with its members
    ///
    /// Members that already exist elsewhere are moved into the new team and
    /// take the supplied username and activity flag.
    pub async fn create_team(&self, team_name: &str, members: Vec<TeamMember>) -> Result<Team> {
        const OP: &str = "create_team";

        let team = self
            .bounded(OP, async {
                let mut tx = self.begin(OP).await?;
                let result = Self::create_team_in(tx.as_mut(), team_name, members).await;
                self.finish(OP, tx, result).await
            })
            .await?;

        info!(team_name, members = team.members.len(), "Team created");
        Ok(team)
    }

    async fn create_team_in(
        tx: &mut dyn StoreTx,
        team_name: &str,
        members: Vec<TeamMember>,
    ) -> Result<Team> {
        if team_name.trim().is_empty() {
            return Err(Error::BadRequest("team_name must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for member in &members {
            if member.user_id.is_empty() {
                return Err(Error::BadRequest("user_id must not be empty".into()));
            }
            if !seen.insert(member.user_id.as_str()) {
                return Err(Error::BadRequest(format!(
                    "duplicate member '{}' in team '{}'",
                    member.user_id, team_name
                )));
            }
        }

        if tx.team_exists(team_name).await? {
            return Err(Error::TeamExists(team_name.to_string()));
        }

        let users: Vec<User> = members
            .into_iter()
            .map(|member| member.into_user(team_name))
            .collect();
        tx.create_team(team_name, &users).await?;

        tx.get_team(team_name).await
    }

    /// Team with its members ordered by user id
    pub async fn get_team(&self, team_name: &str) -> Result<Team> {
        const OP: &str = "get_team";

        self.bounded(OP, async {
            let mut tx = self.begin(OP).await?;
            let result = tx.get_team(team_name).await;
            self.finish(OP, tx, result).await
        })
        .await
    }

    /// Set a single user's activity flag
    ///
    /// Existing reviewer assignments are left as they are; only future
    /// selections see the new flag.
    pub async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User> {
        const OP: &str = "set_user_active";

        let user = self
            .bounded(OP, async {
                let mut tx = self.begin(OP).await?;
                let result = async {
                    tx.set_user_active(user_id, is_active).await?;
                    tx.get_user(user_id).await
                }
                .await;
                self.finish(OP, tx, result).await
            })
            .await?;

        info!(user_id, is_active, "User activity updated");
        Ok(user)
    }

    /// Pull requests the user is assigned to review
    pub async fn user_reviews(&self, user_id: &str) -> Result<UserReviews> {
        const OP: &str = "user_reviews";

        self.bounded(OP, async {
            let mut tx = self.begin(OP).await?;
            let result = async {
                tx.get_user(user_id).await?;
                let prs = tx.user_reviews(user_id).await?;
                Ok::<_, Error>(UserReviews {
                    user_id: user_id.to_string(),
                    pull_requests: prs.into_iter().map(PullRequestShort::from).collect(),
                })
            }
            .await;
            self.finish(OP, tx, result).await
        })
        .await
    }

    /// Number of PR assignments per reviewer, keyed by user id
    pub async fn assignment_stats(&self) -> Result<BTreeMap<String, u64>> {
        const OP: &str = "assignment_stats";

        self.bounded(OP, async {
            let mut tx = self.begin(OP).await?;
            let result = tx.assignment_stats().await;
            self.finish(OP, tx, result).await
        })
        .await
    }
}
