//! SQLite implementation of the reviewer `Store` port
//!
//! Each scope is one SQLite transaction on a pooled connection. Dropping a
//! scope without committing rolls the transaction back.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reviewer_core::store::{Store, StoreTx};
use reviewer_core::{Error, PrStatus, PullRequest, Reassignment, Result, Team, User};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use crate::models::{PullRequestRow, UserRow};

const USER_COLUMNS: &str = "user_id, username, team_name, is_active";
const PR_COLUMNS: &str =
    "pull_request_id, pull_request_name, author_id, status, created_at, merged_at";

/// Store backed by a SQLite connection pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await.map_err(db_err("begin"))?;
        Ok(Box::new(SqliteTx { tx }))
    }
}

/// One open SQLite transaction
struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

/// Map a backend failure for the named operation
fn db_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Error {
    move |err| Error::storage(operation, err)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// `?, ?, ?` for an IN list of `n` values
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl SqliteTx {
    async fn reviewers_of(&mut self, pr_id: &str) -> Result<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            "SELECT user_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY id",
        )
        .bind(pr_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err("list reviewers"))
    }

    async fn insert_reviewer(&mut self, pr_id: &str, user_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO pr_reviewers (pull_request_id, user_id) VALUES (?, ?)
             ON CONFLICT (pull_request_id, user_id) DO NOTHING",
        )
        .bind(pr_id)
        .bind(user_id)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err("add reviewer"))?;
        Ok(())
    }
}

#[async_trait]
impl StoreTx for SqliteTx {
    async fn create_team(&mut self, team_name: &str, members: &[User]) -> Result<()> {
        sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
            .bind(team_name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::TeamExists(team_name.to_string())
                } else {
                    Error::storage("create team", e)
                }
            })?;

        for member in members {
            sqlx::query(
                r#"
                INSERT INTO users (user_id, username, team_name, is_active)
                VALUES (?, ?, ?, ?)
                ON CONFLICT (user_id) DO UPDATE SET
                    username = excluded.username,
                    team_name = excluded.team_name,
                    is_active = excluded.is_active
                "#,
            )
            .bind(&member.user_id)
            .bind(&member.username)
            .bind(team_name)
            .bind(member.is_active)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err("upsert user"))?;
        }

        debug!(team_name, members = members.len(), "Inserted team");
        Ok(())
    }

    async fn team_exists(&mut self, team_name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams WHERE team_name = ?")
            .bind(team_name)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(db_err("check team"))?;
        Ok(count > 0)
    }

    async fn get_team(&mut self, team_name: &str) -> Result<Team> {
        if !self.team_exists(team_name).await? {
            return Err(Error::TeamNotFound(team_name.to_string()));
        }

        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE team_name = ? ORDER BY user_id",
            USER_COLUMNS
        ))
        .bind(team_name)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err("get team"))?;

        Ok(Team {
            team_name: team_name.to_string(),
            members: rows.into_iter().map(User::from).collect(),
        })
    }

    async fn get_user(&mut self, user_id: &str) -> Result<User> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE user_id = ?",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err("get user"))?
        .map(User::from)
        .ok_or_else(|| Error::UserNotFound(user_id.to_string()))
    }

    async fn set_user_active(&mut self, user_id: &str, is_active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE user_id = ?")
            .bind(is_active)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err("set user active"))?;

        if result.rows_affected() == 0 {
            return Err(Error::UserNotFound(user_id.to_string()));
        }
        Ok(())
    }

    async fn deactivate_users(&mut self, user_ids: &[String]) -> Result<()> {
        if user_ids.is_empty() {
            return Ok(());
        }

        let sql = format!(
            "UPDATE users SET is_active = 0 WHERE user_id IN ({})",
            placeholders(user_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for user_id in user_ids {
            query = query.bind(user_id);
        }

        let result = query
            .execute(&mut *self.tx)
            .await
            .map_err(db_err("deactivate users"))?;
        debug!(rows = result.rows_affected(), "Deactivated users");
        Ok(())
    }

    async fn active_team_members(
        &mut self,
        team_name: &str,
        exclude_user_id: Option<&str>,
    ) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users
             WHERE team_name = ? AND is_active = 1 AND (? IS NULL OR user_id != ?)
             ORDER BY user_id",
            USER_COLUMNS
        ))
        .bind(team_name)
        .bind(exclude_user_id)
        .bind(exclude_user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err("list active members"))?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn pr_exists(&mut self, pr_id: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pull_requests WHERE pull_request_id = ?")
                .bind(pr_id)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(db_err("check pull request"))?;
        Ok(count > 0)
    }

    async fn create_pr(&mut self, pr: &PullRequest, reviewer_ids: &[String]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pull_requests (
                pull_request_id, pull_request_name, author_id, status, created_at, merged_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.pull_request_id)
        .bind(&pr.pull_request_name)
        .bind(&pr.author_id)
        .bind(pr.status.as_str())
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::PrExists(pr.pull_request_id.clone())
            } else {
                Error::storage("create pull request", e)
            }
        })?;

        for reviewer_id in reviewer_ids {
            self.insert_reviewer(&pr.pull_request_id, reviewer_id).await?;
        }
        Ok(())
    }

    async fn merge_pr(&mut self, pr_id: &str, merged_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            "UPDATE pull_requests SET status = ?, merged_at = ? WHERE pull_request_id = ?",
        )
        .bind(PrStatus::Merged.as_str())
        .bind(merged_at)
        .bind(pr_id)
        .execute(&mut *self.tx)
        .await
        .map_err(db_err("merge pull request"))?;

        if result.rows_affected() == 0 {
            return Err(Error::PrNotFound(pr_id.to_string()));
        }
        Ok(())
    }

    async fn get_pr_with_reviewers(&mut self, pr_id: &str) -> Result<(PullRequest, Vec<String>)> {
        let pr = sqlx::query_as::<_, PullRequestRow>(&format!(
            "SELECT {} FROM pull_requests WHERE pull_request_id = ?",
            PR_COLUMNS
        ))
        .bind(pr_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(db_err("get pull request"))?
        .ok_or_else(|| Error::PrNotFound(pr_id.to_string()))?
        .into_pull_request()?;

        let reviewers = self.reviewers_of(pr_id).await?;
        Ok((pr, reviewers))
    }

    async fn is_reviewer_assigned(&mut self, pr_id: &str, user_id: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM pr_reviewers WHERE pull_request_id = ? AND user_id = ?",
        )
        .bind(pr_id)
        .bind(user_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(db_err("check reviewer"))?;
        Ok(count > 0)
    }

    async fn add_reviewer(&mut self, pr_id: &str, user_id: &str) -> Result<()> {
        self.insert_reviewer(pr_id, user_id).await
    }

    async fn remove_reviewer(&mut self, pr_id: &str, user_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ? AND user_id = ?")
            .bind(pr_id)
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(db_err("remove reviewer"))?;
        Ok(())
    }

    async fn user_reviews(&mut self, user_id: &str) -> Result<Vec<PullRequest>> {
        let rows = sqlx::query_as::<_, PullRequestRow>(
            r#"
            SELECT p.pull_request_id, p.pull_request_name, p.author_id,
                   p.status, p.created_at, p.merged_at
            FROM pull_requests p
            JOIN pr_reviewers r ON r.pull_request_id = p.pull_request_id
            WHERE r.user_id = ?
            ORDER BY p.pull_request_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(db_err("list user reviews"))?;

        rows.into_iter()
            .map(PullRequestRow::into_pull_request)
            .collect()
    }

    async fn open_prs_with_reviewers(
        &mut self,
        reviewer_ids: &[String],
    ) -> Result<Vec<(PullRequest, Vec<String>)>> {
        if reviewer_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT DISTINCT p.pull_request_id, p.pull_request_name, p.author_id,
                   p.status, p.created_at, p.merged_at
            FROM pull_requests p
            JOIN pr_reviewers r ON r.pull_request_id = p.pull_request_id
            WHERE p.status = ? AND r.user_id IN ({})
            ORDER BY p.pull_request_id
            "#,
            placeholders(reviewer_ids.len())
        );
        let mut query = sqlx::query_as::<_, PullRequestRow>(&sql).bind(PrStatus::Open.as_str());
        for reviewer_id in reviewer_ids {
            query = query.bind(reviewer_id);
        }

        let rows = query
            .fetch_all(&mut *self.tx)
            .await
            .map_err(db_err("list open pull requests"))?;

        let mut affected = Vec::with_capacity(rows.len());
        for row in rows {
            let pr = row.into_pull_request()?;
            let reviewers = self.reviewers_of(&pr.pull_request_id).await?;
            affected.push((pr, reviewers));
        }
        Ok(affected)
    }

    async fn bulk_reassign_reviewers(&mut self, reassignments: &[Reassignment]) -> Result<()> {
        for swap in reassignments {
            self.remove_reviewer(&swap.pull_request_id, &swap.old_reviewer_id)
                .await?;
            if let Some(new_id) = &swap.new_reviewer_id {
                self.insert_reviewer(&swap.pull_request_id, new_id).await?;
            }
        }

        debug!(swaps = reassignments.len(), "Applied reviewer swaps");
        Ok(())
    }

    async fn assignment_stats(&mut self) -> Result<BTreeMap<String, u64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT user_id, COUNT(*) FROM pr_reviewers GROUP BY user_id")
                .fetch_all(&mut *self.tx)
                .await
                .map_err(db_err("assignment stats"))?;

        Ok(rows
            .into_iter()
            .map(|(user_id, count)| (user_id, count.max(0) as u64))
            .collect())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(db_err("commit"))
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(db_err("rollback"))
    }
}
