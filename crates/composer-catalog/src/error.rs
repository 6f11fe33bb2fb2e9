//! Error types for catalog collaborators

use crate::entity::EntityId;

/// Errors raised by the catalog read service and lock service
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Requested plan does not exist
    #[error("unknown plan: {0}")]
    UnknownPlan(EntityId),

    /// Backend could not be reached
    #[error("catalog unavailable: {0}")]
    Unavailable(String),

    /// Lock bookkeeping failed
    #[error("lock service error: {0}")]
    Lock(String),

    /// Fixture or snapshot could not be decoded
    #[error("invalid catalog data: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CatalogError {
    /// Check if a retry may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_error_display() {
        let err = CatalogError::UnknownPlan(EntityId::from("p9"));
        assert_eq!(err.to_string(), "unknown plan: p9");
        assert!(!err.is_retryable());
        assert!(CatalogError::Unavailable("down".into()).is_retryable());
    }
}
