//! Error types for draft mutations

use composer_catalog::{EntityType, FieldKind};

/// Rejected patch input
///
/// Field names are closed enums, so a patch can never name a field outside
/// its schema. What remains to reject is a value of the wrong kind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatchError {
    /// Value kind does not fit the field
    #[error("{entity}.{field} expects {expected:?}, got {actual:?}")]
    KindMismatch {
        /// Schema of the target
        entity: EntityType,
        /// Field wire name
        field: &'static str,
        /// Kind the field accepts
        expected: FieldKind,
        /// Kind supplied
        actual: FieldKind,
    },
}
