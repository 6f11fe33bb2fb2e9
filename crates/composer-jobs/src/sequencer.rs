//! Ordered jobs and validator-gated navigation
//!
//! Navigation is split into two synchronous halves so a caller holding the
//! sequencer behind a lock can release it while the validator runs:
//! [`JobSequencer::begin_navigation`] issues a ticket and
//! [`JobSequencer::complete_navigation`] applies the verdict. Any later
//! attempt or direct index change invalidates older tickets, so a slow
//! validator can never revert a newer navigation.

use crate::error::SequenceError;
use crate::job::{Job, JobId};
use crate::validator::{NavigationRequest, NavigationValidator};
use serde::{Deserialize, Serialize};

/// Handle for one navigation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a ticket must be completed for navigation to take effect"]
pub struct NavigationTicket {
    generation: u64,
    request: NavigationRequest,
}

impl NavigationTicket {
    /// What the validator should approve
    #[inline]
    pub fn request(&self) -> NavigationRequest {
        self.request
    }
}

/// Result of a navigation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum NavigationOutcome {
    /// Current index changed
    Moved {
        /// Previous index
        from: usize,
        /// New index
        to: usize,
    },
    /// Validator declined or failed; index unchanged
    Blocked,
    /// A newer navigation happened first; verdict ignored
    Superseded,
}

impl NavigationOutcome {
    #[inline]
    #[must_use]
    pub fn moved(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

/// Ordered jobs ("pages") with a current position
#[derive(Debug, Clone, Default)]
pub struct JobSequencer {
    jobs: Vec<Job>,
    current: usize,
    generation: u64,
}

impl JobSequencer {
    /// Empty sequence
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a job and make it current
    ///
    /// # Errors
    /// Returns `SequenceError::DuplicateJob` if the id is already present
    pub fn add_job(&mut self, job: Job) -> Result<JobId, SequenceError> {
        let id = job.id();
        if self.position(id).is_some() {
            return Err(SequenceError::DuplicateJob(id));
        }
        tracing::info!(job = %id, job_type = %job.job_type(), plans = job.plan_ids().len(), "job added");
        self.jobs.push(job);
        self.current = self.jobs.len() - 1;
        self.generation += 1;
        Ok(id)
    }

    /// Remove a job together with its pending state
    ///
    /// The current index is clamped into range (0 when empty).
    ///
    /// # Errors
    /// Returns `SequenceError::UnknownJob` if no job has this id
    pub fn remove_job(&mut self, id: JobId) -> Result<Job, SequenceError> {
        let index = self.position(id).ok_or(SequenceError::UnknownJob(id))?;
        let job = self.jobs.remove(index);
        self.current = self.current.min(self.jobs.len().saturating_sub(1));
        self.generation += 1;
        tracing::info!(job = %id, remaining = self.jobs.len(), "job removed");
        Ok(job)
    }

    /// Set the current index without validation
    ///
    /// For callers that already validated. Invalidates pending tickets.
    ///
    /// # Errors
    /// Returns `SequenceError::IndexOutOfRange` past the last job
    pub fn set_current_index(&mut self, index: usize) -> Result<(), SequenceError> {
        self.check_index(index)?;
        self.current = index;
        self.generation += 1;
        Ok(())
    }

    /// Start a navigation attempt
    ///
    /// # Errors
    /// Returns `SequenceError::IndexOutOfRange` past the last job
    pub fn begin_navigation(&mut self, next: usize) -> Result<NavigationTicket, SequenceError> {
        self.check_index(next)?;
        self.generation += 1;
        Ok(NavigationTicket {
            generation: self.generation,
            request: NavigationRequest {
                from: self.current,
                to: next,
                job: self.current_job().map(Job::id),
            },
        })
    }

    /// Apply a validator verdict to a ticket
    pub fn complete_navigation(&mut self, ticket: NavigationTicket, approved: bool) -> NavigationOutcome {
        let NavigationRequest { from, to, .. } = ticket.request;
        if ticket.generation != self.generation {
            tracing::warn!(from, to, "stale navigation verdict ignored");
            return NavigationOutcome::Superseded;
        }
        if !approved {
            tracing::warn!(from, to, "navigation blocked by validator");
            return NavigationOutcome::Blocked;
        }
        if to >= self.jobs.len() {
            return NavigationOutcome::Blocked;
        }
        self.current = to;
        tracing::debug!(from, to, "navigated");
        NavigationOutcome::Moved { from, to }
    }

    /// Validate then move
    ///
    /// A validator error counts as a refusal.
    ///
    /// # Errors
    /// Returns `SequenceError::IndexOutOfRange` past the last job
    pub async fn navigate(
        &mut self,
        next: usize,
        validator: &dyn NavigationValidator,
    ) -> Result<NavigationOutcome, SequenceError> {
        let ticket = self.begin_navigation(next)?;
        let approved = run_validator(validator, ticket.request()).await;
        Ok(self.complete_navigation(ticket, approved))
    }

    #[inline]
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Job at the current index
    #[inline]
    #[must_use]
    pub fn current_job(&self) -> Option<&Job> {
        self.jobs.get(self.current)
    }

    /// Index of a job
    #[must_use]
    pub fn position(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|j| j.id() == id)
    }

    #[must_use]
    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id() == id)
    }

    pub fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id() == id)
    }

    /// Jobs in page order
    #[inline]
    #[must_use]
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn jobs_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.iter_mut()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Drop every job
    pub fn clear(&mut self) {
        self.jobs.clear();
        self.current = 0;
        self.generation += 1;
    }

    fn check_index(&self, index: usize) -> Result<(), SequenceError> {
        if index < self.jobs.len() {
            Ok(())
        } else {
            Err(SequenceError::IndexOutOfRange {
                index,
                len: self.jobs.len(),
            })
        }
    }
}

/// Run a validator, folding errors into a refusal
pub async fn run_validator(validator: &dyn NavigationValidator, request: NavigationRequest) -> bool {
    match validator.validate(request).await {
        Ok(approved) => approved,
        Err(e) => {
            tracing::warn!(error = %e, from = request.from, to = request.to, "validator failed");
            false
        }
    }
}
