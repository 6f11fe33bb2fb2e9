//! Baseline + patch merging

use composer_catalog::{Entity, EntityField};
use composer_draft::{DraftSpace, Drafted, Patch};
use std::collections::BTreeSet;

/// Shallow merge of a patch onto a copy of `baseline`
///
/// Fields absent from the patch inherit baseline values. `baseline` is not
/// mutated.
#[must_use]
pub fn project_entity<T: Entity>(baseline: &T, patch: Option<&Patch<T>>) -> T {
    match patch {
        Some(patch) => patch.apply_to(baseline),
        None => baseline.clone(),
    }
}

/// Whether one field of one target has a pending change
#[inline]
#[must_use]
pub fn field_is_dirty<T: Drafted>(space: &DraftSpace, key: &T::Key, field: T::Field) -> bool {
    space.has_field::<T>(key, field)
}

/// Fields of one target with pending changes
#[must_use]
pub fn dirty_fields<T: Drafted>(space: &DraftSpace, key: &T::Key) -> BTreeSet<T::Field> {
    space
        .patch::<T>(key)
        .map(|p| p.fields().collect())
        .unwrap_or_default()
}

/// A record as the editor should render it
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<T: Drafted> {
    /// Patch target key
    pub key: T::Key,
    /// Baseline with pending changes applied
    pub record: T,
    /// Fields that differ from baseline
    pub dirty: BTreeSet<T::Field>,
}

impl<T: Drafted> Merged<T> {
    /// Any pending change on this record
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Whether `field` is pending
    #[inline]
    #[must_use]
    pub fn is_field_dirty(&self, field: T::Field) -> bool {
        self.dirty.contains(&field)
    }

    /// Dirty field names in wire form
    #[must_use]
    pub fn dirty_names(&self) -> Vec<&'static str> {
        self.dirty.iter().map(|f| f.name()).collect()
    }
}

/// Merge the pending patch of `key` onto `baseline`
#[must_use]
pub fn merge<T: Drafted>(space: &DraftSpace, key: T::Key, baseline: &T) -> Merged<T> {
    let patch = space.patch::<T>(&key);
    Merged {
        record: project_entity(baseline, patch),
        dirty: dirty_fields::<T>(space, &key),
        key,
    }
}
