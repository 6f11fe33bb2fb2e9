//! Error types for the composer session

use crate::config::ConfigError;
use composer_catalog::CatalogError;
use composer_draft::PatchError;
use composer_jobs::{JobId, SequenceError};
use composer_projection::FieldIssue;

/// Main composer error type
#[derive(Debug, thiserror::Error)]
pub enum ComposerError {
    /// No job with this id
    #[error("unknown job {0}")]
    UnknownJob(JobId),

    /// Job is submitted and rejects edits
    #[error("job {0} is submitted and frozen")]
    JobFrozen(JobId),

    /// Job created without target plans
    #[error("a job needs at least one plan")]
    EmptyPlanSelection,

    /// Effective state breaks field rules
    #[error("{} field issue(s), first: {}", issues.len(), first_issue(issues))]
    Invalid {
        /// Every violation found
        issues: Vec<FieldIssue>,
    },

    /// Rejected patch value
    #[error("patch rejected: {0}")]
    Patch(#[from] PatchError),

    /// Sequencing failure other than lookup and freeze
    #[error("sequence error: {0}")]
    Sequence(SequenceError),

    /// Catalog fetch failure
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Configuration failure
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

fn first_issue(issues: &[FieldIssue]) -> String {
    issues
        .first()
        .map(|i| format!("{} {}.{} {}", i.entity_type, i.target, i.field, i.message))
        .unwrap_or_default()
}

impl From<SequenceError> for ComposerError {
    fn from(err: SequenceError) -> Self {
        match err {
            SequenceError::UnknownJob(id) => Self::UnknownJob(id),
            SequenceError::Frozen(id) => Self::JobFrozen(id),
            other => Self::Sequence(other),
        }
    }
}

impl ComposerError {
    /// Check if a retry may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Catalog(e) if e.is_retryable())
    }

    /// Whether the user must fix field values first
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Invalid { .. } | Self::Patch(_))
    }
}

/// Composer result alias
pub type Result<T> = std::result::Result<T, ComposerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use composer_catalog::EntityType;

    #[test]
    fn sequence_lookup_errors_map_to_session_variants() {
        let id = JobId::new();
        assert!(matches!(ComposerError::from(SequenceError::UnknownJob(id)), ComposerError::UnknownJob(x) if x == id));
        assert!(matches!(ComposerError::from(SequenceError::Frozen(id)), ComposerError::JobFrozen(_)));
        assert!(matches!(
            ComposerError::from(SequenceError::IndexOutOfRange { index: 3, len: 1 }),
            ComposerError::Sequence(_)
        ));
    }

    #[test]
    fn invalid_display_names_first_issue() {
        let err = ComposerError::Invalid {
            issues: vec![FieldIssue {
                entity_type: EntityType::Plan,
                target: "p1".into(),
                field: "name".into(),
                message: "must not be empty".into(),
            }],
        };
        assert_eq!(err.to_string(), "1 field issue(s), first: plan p1.name must not be empty");
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn unavailable_catalog_is_retryable() {
        let err = ComposerError::from(CatalogError::Unavailable("timeout".into()));
        assert!(err.is_retryable());
    }
}
