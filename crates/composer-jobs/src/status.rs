//! Job status transitions

use crate::error::SequenceError;
use crate::job::JobStatus;

/// Validate a status change
///
/// # Errors
/// Returns `SequenceError::IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: JobStatus, to: JobStatus) -> Result<(), SequenceError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(SequenceError::IllegalTransition { from, to })
    }
}

/// Statuses reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: JobStatus) -> Vec<JobStatus> {
    use JobStatus::{Draft, Ready, Submitted};
    match from {
        Draft => vec![Ready, Submitted],
        Ready => vec![Draft, Submitted],
        Submitted => vec![],
    }
}

fn allowed(from: JobStatus, to: JobStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
