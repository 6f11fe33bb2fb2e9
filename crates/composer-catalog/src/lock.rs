//! Advisory plan locks and master-job progress
//!
//! Locks are simple ownership flags keyed by plan id. Editing never waits on
//! them: a session may stage edits for a plan whose lock is held elsewhere,
//! the flag only informs the user.

use crate::entity::EntityId;
use crate::error::CatalogError;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use ulid::Ulid;

/// Result of a lock request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockOutcome {
    /// Plans now held by the requester
    pub locked: Vec<EntityId>,
    /// Plans held by someone else, with the holder
    pub held_elsewhere: Vec<(EntityId, String)>,
}

impl LockOutcome {
    /// Every requested plan was locked
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.held_elsewhere.is_empty()
    }
}

/// One progress update of a long-running master job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterJobProgress {
    /// Master job id
    pub job_id: Ulid,
    /// Plans processed so far
    pub completed: usize,
    /// Plans in the job
    pub total: usize,
    /// Plan just processed
    pub plan_id: Option<EntityId>,
}

impl MasterJobProgress {
    /// Whether this is the final update
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.completed >= self.total
    }
}

/// Handle to a running master job
#[derive(Debug)]
pub struct MasterJobHandle {
    /// Master job id
    pub id: Ulid,
    /// Progress stream, closed when the job finishes
    pub progress: mpsc::Receiver<MasterJobProgress>,
}

/// Lock and job-creation collaborator
#[async_trait]
pub trait LockService: Send + Sync + Debug {
    /// Try to lock every plan for `owner`
    ///
    /// Partial success is not an error; see [`LockOutcome::held_elsewhere`].
    ///
    /// # Errors
    /// Returns `CatalogError::Lock` if the backend fails
    async fn acquire(&self, owner: &str, plan_ids: &[EntityId]) -> Result<LockOutcome, CatalogError>;

    /// Release the plans `owner` holds; others are untouched
    ///
    /// # Errors
    /// Returns `CatalogError::Lock` if the backend fails
    async fn release(&self, owner: &str, plan_ids: &[EntityId]) -> Result<(), CatalogError>;

    /// Start a master job over `plan_ids` and stream its progress
    ///
    /// # Errors
    /// Returns `CatalogError::Lock` if the job cannot be created
    async fn start_master_job(&self, plan_ids: &[EntityId]) -> Result<MasterJobHandle, CatalogError>;
}

/// Lock flags held in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLocks {
    holders: Arc<DashMap<EntityId, String>>,
    step: Duration,
}

impl InMemoryLocks {
    /// Create empty lock table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay between master-job progress updates
    #[inline]
    #[must_use]
    pub fn with_step(mut self, step: Duration) -> Self {
        self.step = step;
        self
    }

    /// Current holder of a plan lock
    #[must_use]
    pub fn holder(&self, plan_id: &EntityId) -> Option<String> {
        self.holders.get(plan_id).map(|h| h.value().clone())
    }
}

#[async_trait]
impl LockService for InMemoryLocks {
    async fn acquire(&self, owner: &str, plan_ids: &[EntityId]) -> Result<LockOutcome, CatalogError> {
        let mut outcome = LockOutcome::default();
        for id in plan_ids {
            match self.holders.entry(id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(owner.to_string());
                    outcome.locked.push(id.clone());
                }
                Entry::Occupied(slot) if slot.get() == owner => outcome.locked.push(id.clone()),
                Entry::Occupied(slot) => {
                    outcome.held_elsewhere.push((id.clone(), slot.get().clone()));
                }
            }
        }
        if !outcome.is_complete() {
            tracing::warn!(
                owner,
                contested = outcome.held_elsewhere.len(),
                "some plan locks are held by another owner"
            );
        }
        Ok(outcome)
    }

    async fn release(&self, owner: &str, plan_ids: &[EntityId]) -> Result<(), CatalogError> {
        for id in plan_ids {
            self.holders.remove_if(id, |_, holder| holder == owner);
        }
        Ok(())
    }

    async fn start_master_job(&self, plan_ids: &[EntityId]) -> Result<MasterJobHandle, CatalogError> {
        let id = Ulid::new();
        let plans = plan_ids.to_vec();
        let total = plans.len();
        let step = self.step;
        let (tx, rx) = mpsc::channel(total.max(1));

        tokio::spawn(async move {
            if total == 0 {
                let _ = tx
                    .send(MasterJobProgress { job_id: id, completed: 0, total: 0, plan_id: None })
                    .await;
                return;
            }
            for (i, plan_id) in plans.into_iter().enumerate() {
                if !step.is_zero() {
                    tokio::time::sleep(step).await;
                }
                let update = MasterJobProgress {
                    job_id: id,
                    completed: i + 1,
                    total,
                    plan_id: Some(plan_id),
                };
                if tx.send(update).await.is_err() {
                    tracing::debug!(%id, "master job progress receiver dropped");
                    return;
                }
            }
        });

        tracing::info!(%id, plans = total, "master job started");
        Ok(MasterJobHandle { id, progress: rx })
    }
}
