//! Typed partial records
//!
//! A [`Patch<T>`] holds only the fields the user changed. Absence of a key
//! means "inherit baseline"; a patch with no keys is equivalent to no draft
//! and is never stored.

use crate::error::PatchError;
use composer_catalog::{Entity, EntityField, FieldValue};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Changed fields of one entity instance
///
/// Deserializing runs every value through the same kind check as
/// [`Patch::insert`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent, bound(serialize = ""))]
pub struct Patch<T: Entity> {
    fields: BTreeMap<T::Field, FieldValue>,
}

impl<T: Entity> Default for Patch<T> {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }
}

impl<'de, T: Entity> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<T::Field, FieldValue>::deserialize(deserializer)?;
        Self::from_entries(entries).map_err(serde::de::Error::custom)
    }
}

impl<T: Entity> Patch<T> {
    /// Empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from field/value pairs
    ///
    /// # Errors
    /// Returns `PatchError::KindMismatch` on the first ill-typed value
    pub fn from_entries(
        entries: impl IntoIterator<Item = (T::Field, FieldValue)>,
    ) -> Result<Self, PatchError> {
        let mut patch = Self::new();
        for (field, value) in entries {
            patch.insert(field, value)?;
        }
        Ok(patch)
    }

    /// No changed fields
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of changed fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Pending value of a field
    #[inline]
    #[must_use]
    pub fn get(&self, field: T::Field) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Whether the field is present (changed)
    #[inline]
    #[must_use]
    pub fn contains(&self, field: T::Field) -> bool {
        self.fields.contains_key(&field)
    }

    /// Changed fields with their values, field order
    pub fn iter(&self) -> impl Iterator<Item = (T::Field, &FieldValue)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    /// Changed field names
    pub fn fields(&self) -> impl Iterator<Item = T::Field> + '_ {
        self.fields.keys().copied()
    }

    /// Set a field, widening the value to the field's kind where lossless
    ///
    /// # Errors
    /// Returns `PatchError::KindMismatch` if the value cannot fit the field
    pub fn insert(&mut self, field: T::Field, value: FieldValue) -> Result<(), PatchError> {
        let value = conform::<T>(field, value)?;
        self.fields.insert(field, value);
        Ok(())
    }

    /// Drop a field
    #[inline]
    pub fn remove(&mut self, field: T::Field) -> Option<FieldValue> {
        self.fields.remove(&field)
    }

    /// Shallow merge onto a copy of `base`
    ///
    /// `base` is not touched.
    #[must_use]
    pub fn apply_to(&self, base: &T) -> T {
        let mut merged = base.clone();
        for (field, value) in &self.fields {
            let applied = merged.set(*field, value);
            debug_assert!(applied, "unconformed value for {field}");
        }
        merged
    }
}

/// Coerce `value` into `field`'s kind
pub(crate) fn conform<T: Entity>(field: T::Field, value: FieldValue) -> Result<FieldValue, PatchError> {
    let actual = value.kind();
    value.coerce(field.kind()).ok_or(PatchError::KindMismatch {
        entity: T::ENTITY_TYPE,
        field: field.name(),
        expected: field.kind(),
        actual,
    })
}

/// What a field toggle did to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOutcome {
    /// Field now carries the new value
    Set,
    /// Field matched its original and was dropped
    Reverted,
    /// Nothing changed
    Unchanged,
}

/// Apply one field toggle to a patch map
///
/// `value` equal to `original` (NaN-equal) removes the field, and a target
/// whose patch empties is removed from the map.
pub(crate) fn toggle_field<K, T>(
    map: &mut BTreeMap<K, Patch<T>>,
    key: K,
    field: T::Field,
    value: FieldValue,
    original: FieldValue,
) -> Result<PatchOutcome, PatchError>
where
    K: Ord,
    T: Entity,
{
    let value = conform::<T>(field, value)?;
    let original = conform::<T>(field, original)?;

    if value.same_as(&original) {
        let Some(patch) = map.get_mut(&key) else {
            return Ok(PatchOutcome::Unchanged);
        };
        if patch.remove(field).is_none() {
            return Ok(PatchOutcome::Unchanged);
        }
        if patch.is_empty() {
            map.remove(&key);
        }
        return Ok(PatchOutcome::Reverted);
    }

    let patch = map.entry(key).or_default();
    if patch.get(field).is_some_and(|current| current.same_as(&value)) {
        return Ok(PatchOutcome::Unchanged);
    }
    patch.fields.insert(field, value);
    Ok(PatchOutcome::Set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer_catalog::{Plan, PlanField};
    use pretty_assertions::assert_eq;

    #[test]
    fn apply_to_leaves_base_untouched() {
        let base = Plan::new("p1", "Basic", 10.0);
        let patch = Patch::<Plan>::from_entries([(PlanField::BasePrice, 15.0.into())]).unwrap();
        let merged = patch.apply_to(&base);
        assert_eq!(merged.base_price, 15.0);
        assert_eq!(base.base_price, 10.0);
    }

    #[test]
    fn insert_widens_integers_for_number_fields() {
        let mut patch = Patch::<Plan>::new();
        patch.insert(PlanField::BasePrice, FieldValue::Integer(12)).unwrap();
        assert_eq!(patch.get(PlanField::BasePrice), Some(&FieldValue::Number(12.0)));
    }

    #[test]
    fn insert_rejects_wrong_kind() {
        let mut patch = Patch::<Plan>::new();
        let err = patch.insert(PlanField::Active, "yes".into()).unwrap_err();
        assert!(matches!(err, PatchError::KindMismatch { field: "active", .. }));
        assert!(patch.is_empty());
    }

    #[test]
    fn toggle_to_original_removes_target() {
        let mut map: BTreeMap<&str, Patch<Plan>> = BTreeMap::new();
        let set = toggle_field(&mut map, "p1", PlanField::Tier, 2_i64.into(), 1_i64.into()).unwrap();
        assert_eq!(set, PatchOutcome::Set);
        let back = toggle_field(&mut map, "p1", PlanField::Tier, 1_i64.into(), 1_i64.into()).unwrap();
        assert_eq!(back, PatchOutcome::Reverted);
        assert!(map.is_empty());
    }

    #[test]
    fn toggle_nan_against_nan_original_is_unchanged() {
        let mut map: BTreeMap<&str, Patch<Plan>> = BTreeMap::new();
        let out = toggle_field(
            &mut map,
            "p1",
            PlanField::BasePrice,
            f64::NAN.into(),
            f64::NAN.into(),
        )
        .unwrap();
        assert_eq!(out, PatchOutcome::Unchanged);
        assert!(map.is_empty());
    }

    #[test]
    fn toggle_nan_twice_is_idempotent() {
        let mut map: BTreeMap<&str, Patch<Plan>> = BTreeMap::new();
        toggle_field(&mut map, "p1", PlanField::BasePrice, f64::NAN.into(), 10.0.into()).unwrap();
        let again =
            toggle_field(&mut map, "p1", PlanField::BasePrice, f64::NAN.into(), 10.0.into()).unwrap();
        assert_eq!(again, PatchOutcome::Unchanged);
        assert_eq!(map["p1"].len(), 1);
    }

    #[test]
    fn deserialize_rejects_wrong_kind() {
        let err = serde_json::from_str::<Patch<Plan>>(r#"{"active":"yes"}"#).unwrap_err();
        assert!(err.to_string().contains("active"));
    }

    #[test]
    fn deserialize_widens_integers_and_merges() {
        let patch: Patch<Plan> = serde_json::from_str(r#"{"basePrice":15}"#).unwrap();
        assert_eq!(patch.get(PlanField::BasePrice), Some(&FieldValue::Number(15.0)));
        let merged = patch.apply_to(&Plan::new("p1", "Basic", 10.0));
        assert_eq!(merged.base_price, 15.0);
    }

    #[test]
    fn serializes_as_plain_object() {
        let patch = Patch::<Plan>::from_entries([
            (PlanField::BasePrice, 15.0.into()),
            (PlanField::Name, "Gold".into()),
        ])
        .unwrap();
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "name": "Gold", "basePrice": 15.0 }));
    }
}
