//! Error types for job and sequence operations

use crate::job::{JobId, JobStatus};

/// Job sequencing failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequenceError {
    /// Index past the end of the sequence
    #[error("index {index} out of range for {len} jobs")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of jobs
        len: usize,
    },

    /// No job with this id
    #[error("unknown job {0}")]
    UnknownJob(JobId),

    /// A job with this id is already sequenced
    #[error("job {0} already exists")]
    DuplicateJob(JobId),

    /// Status change not in the transition table
    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition {
        /// Current status
        from: JobStatus,
        /// Requested status
        to: JobStatus,
    },

    /// Job was submitted and no longer accepts edits
    #[error("job {0} is submitted and frozen")]
    Frozen(JobId),
}

impl SequenceError {
    /// Whether the caller passed a bad index or id
    #[inline]
    #[must_use]
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange { .. } | Self::UnknownJob(_)
        )
    }
}
