//! Reviewer assignment engine
//!
//! [`Engine`] is the entry point for every operation on teams, users, and
//! pull requests. Each public operation runs inside exactly one
//! transactional scope from the configured [`Store`]: it commits on success
//! and rolls back on any error, so callers never observe partial writes.
//!
//! Operations are grouped by concern:
//! - `assignment`: opening, merging, and inspecting pull requests
//! - `reassignment`: replacing a single reviewer
//! - `reconcile`: mass deactivation with reviewer reconciliation
//! - `teams`: team and user bookkeeping

pub mod candidates;
mod assignment;
mod reassignment;
mod reconcile;
mod teams;

pub use candidates::{eligible, Exclusions};
pub use reconcile::{plan_reassignments, ReconciliationPlan};

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, error, warn};

use crate::config::EngineConfig;
use crate::store::{Store, StoreTx};
use crate::{Error, Result};

/// Reviewer assignment and reconciliation engine
pub struct Engine {
    store: Arc<dyn Store>,
    /// Random source for reviewer selection
    rng: Mutex<Box<dyn RngCore + Send>>,
    transaction_timeout: Duration,
}

impl Engine {
    /// Create an engine over the given store with an entropy-seeded RNG
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
            transaction_timeout: EngineConfig::default().transaction_timeout,
        }
    }

    /// Replace the random source used for reviewer selection
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    /// Apply engine settings from configuration
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.transaction_timeout = config.transaction_timeout;
        self
    }

    /// Upper bound on the duration of a single operation
    pub fn transaction_timeout(&self) -> Duration {
        self.transaction_timeout
    }

    /// Run `f` with exclusive access to the random source.
    ///
    /// The lock is never held across an await point.
    fn draw<R>(&self, f: impl FnOnce(&mut dyn RngCore) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut **rng)
    }

    /// Open a transactional scope
    async fn begin(&self, operation: &'static str) -> Result<Box<dyn StoreTx>> {
        self.store.begin().await.inspect_err(|e| {
            error!(operation, error = %e, "Failed to open transaction");
        })
    }

    /// Bound an operation by the transaction timeout.
    ///
    /// When the deadline passes the operation future is dropped, which drops
    /// its open scope and discards every write made so far.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        work: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.transaction_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    operation,
                    timeout = ?self.transaction_timeout,
                    "Operation timed out, transaction rolled back"
                );
                Err(Error::Timeout {
                    operation,
                    elapsed: self.transaction_timeout,
                })
            }
        }
    }

    /// Commit the scope if `result` is Ok, roll it back otherwise
    async fn finish<T>(
        &self,
        operation: &'static str,
        tx: Box<dyn StoreTx>,
        result: Result<T>,
    ) -> Result<T> {
        match result {
            Ok(value) => {
                tx.commit().await.inspect_err(|e| {
                    error!(operation, error = %e, "Failed to commit transaction");
                })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(operation, error = %rollback_err, "Failed to roll back transaction");
                }

                if err.is_internal() {
                    error!(operation, error = %err, "Operation failed");
                } else {
                    debug!(operation, code = %err.code(), error = %err, "Operation rejected");
                }

                Err(err)
            }
        }
    }
}
