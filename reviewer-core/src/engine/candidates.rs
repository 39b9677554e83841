//! Reviewer candidate selection
//!
//! Works on an already-fetched team so that the selection itself never
//! touches storage.

use std::collections::HashSet;

use crate::model::{Team, User};
use crate::store::StoreTx;
use crate::Result;

/// User ids that may not be picked as reviewers for one pull request.
///
/// A per-call working set: built, grown, and dropped within a single
/// engine operation.
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    ids: HashSet<String>,
}

impl Exclusions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusion set seeded from the given ids
    pub fn of<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut exclusions = Self::new();
        exclusions.extend(ids);
        exclusions
    }

    pub fn insert(&mut self, user_id: impl Into<String>) {
        self.ids.insert(user_id.into());
    }

    pub fn extend<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids.extend(ids.into_iter().map(Into::into));
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }
}

/// Active members of `team` that are not excluded, in team order
pub fn eligible<'a>(team: &'a Team, excluded: &Exclusions) -> Vec<&'a User> {
    team.members
        .iter()
        .filter(|member| member.is_active && !excluded.contains(&member.user_id))
        .collect()
}

/// Load the active members of a team inside the current scope and drop the
/// excluded ones, in user id order
///
/// An unknown team has no active members.
pub(crate) async fn candidates_for(
    tx: &mut dyn StoreTx,
    team_name: &str,
    excluded: &Exclusions,
) -> Result<Vec<User>> {
    let active = tx.active_team_members(team_name, None).await?;
    Ok(active
        .into_iter()
        .filter(|member| !excluded.contains(&member.user_id))
        .collect())
}
