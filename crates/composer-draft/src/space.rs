//! Per-job draft space: pending patches for plans, bundles and channels

use crate::error::PatchError;
use crate::patch::{toggle_field, Patch, PatchOutcome};
use composer_catalog::{
    Bundle, BundleField, Channel, ChannelField, Entity, EntityId, EntityType, FieldValue, LinkKey,
    Plan, PlanField,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display};

/// Target of a channel patch
///
/// Channel edits are either global to the channel or scoped to one
/// relationship row (a channel as it appears under a plan or bundle).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChannelTarget {
    /// The channel record itself
    Channel(EntityId),
    /// One occurrence of the channel under an owner
    Link(LinkKey),
}

impl Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel(id) => write!(f, "{id}"),
            Self::Link(key) => write!(f, "{key}"),
        }
    }
}

impl From<LinkKey> for ChannelTarget {
    fn from(key: LinkKey) -> Self {
        Self::Link(key)
    }
}

impl From<EntityId> for ChannelTarget {
    fn from(id: EntityId) -> Self {
        Self::Channel(id)
    }
}

/// Schema whose patches live in a [`DraftSpace`]
pub trait Drafted: Entity {
    /// Key of a patch target for this schema
    type Key: Ord + Clone + Debug + Display + Send + Sync;

    /// Patch map for this schema
    fn patches(space: &DraftSpace) -> &BTreeMap<Self::Key, Patch<Self>>;

    /// Mutable patch map for this schema
    fn patches_mut(space: &mut DraftSpace) -> &mut BTreeMap<Self::Key, Patch<Self>>;
}

impl Drafted for Plan {
    type Key = EntityId;

    fn patches(space: &DraftSpace) -> &BTreeMap<EntityId, Patch<Self>> {
        &space.plan
    }

    fn patches_mut(space: &mut DraftSpace) -> &mut BTreeMap<EntityId, Patch<Self>> {
        &mut space.plan
    }
}

impl Drafted for Bundle {
    type Key = LinkKey;

    fn patches(space: &DraftSpace) -> &BTreeMap<LinkKey, Patch<Self>> {
        &space.bundle
    }

    fn patches_mut(space: &mut DraftSpace) -> &mut BTreeMap<LinkKey, Patch<Self>> {
        &mut space.bundle
    }
}

impl Drafted for Channel {
    type Key = ChannelTarget;

    fn patches(space: &DraftSpace) -> &BTreeMap<ChannelTarget, Patch<Self>> {
        &space.channel
    }

    fn patches_mut(space: &mut DraftSpace) -> &mut BTreeMap<ChannelTarget, Patch<Self>> {
        &mut space.channel
    }
}

/// Pending field patches of one job
///
/// Holds the minimal set of changed fields per target. Targets are created
/// on first edit and removed as soon as their patch empties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftSpace {
    plan: BTreeMap<EntityId, Patch<Plan>>,
    bundle: BTreeMap<LinkKey, Patch<Bundle>>,
    channel: BTreeMap<ChannelTarget, Patch<Channel>>,
}

impl DraftSpace {
    /// Empty space
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle one field of one target
    ///
    /// Sets `value`, or drops the field when `value` equals `original`
    /// (NaN-equal). Reapplying the same call converges.
    ///
    /// # Errors
    /// Returns `PatchError::KindMismatch` if either value does not fit the field
    pub fn patch_field<T: Drafted>(
        &mut self,
        key: T::Key,
        field: T::Field,
        value: FieldValue,
        original: FieldValue,
    ) -> Result<PatchOutcome, PatchError> {
        let label = key.to_string();
        let outcome = toggle_field(T::patches_mut(self), key, field, value, original)?;
        tracing::debug!(
            entity = %T::ENTITY_TYPE,
            target = %label,
            field = %field,
            ?outcome,
            "field toggled"
        );
        Ok(outcome)
    }

    /// Overwrite a target's whole patch; an empty patch removes the target
    pub fn replace_patch<T: Drafted>(&mut self, key: T::Key, patch: Patch<T>) {
        let map = T::patches_mut(self);
        if patch.is_empty() {
            map.remove(&key);
        } else {
            map.insert(key, patch);
        }
    }

    /// Drop one target's patch
    ///
    /// Returns whether a patch was present.
    pub fn clear_target<T: Drafted>(&mut self, key: &T::Key) -> bool {
        T::patches_mut(self).remove(key).is_some()
    }

    /// Patch of one target
    #[inline]
    #[must_use]
    pub fn patch<T: Drafted>(&self, key: &T::Key) -> Option<&Patch<T>> {
        T::patches(self).get(key)
    }

    /// All patches of one schema
    #[inline]
    #[must_use]
    pub fn patches<T: Drafted>(&self) -> &BTreeMap<T::Key, Patch<T>> {
        T::patches(self)
    }

    /// Whether one field of one target is pending
    #[inline]
    #[must_use]
    pub fn has_field<T: Drafted>(&self, key: &T::Key, field: T::Field) -> bool {
        self.patch::<T>(key).is_some_and(|p| p.contains(field))
    }

    /// Apply an entity-tagged edit
    ///
    /// # Errors
    /// Returns `PatchError::KindMismatch` if a value does not fit its field
    pub fn apply(&mut self, edit: FieldEdit) -> Result<PatchOutcome, PatchError> {
        match edit {
            FieldEdit::Plan { target, field, value, original } => {
                self.patch_field::<Plan>(target, field, value, original)
            }
            FieldEdit::Bundle { target, field, value, original } => {
                self.patch_field::<Bundle>(target, field, value, original)
            }
            FieldEdit::Channel { target, field, value, original } => {
                self.patch_field::<Channel>(target, field, value, original)
            }
        }
    }

    /// Drop the patch of an entity-tagged target
    pub fn clear_target_ref(&mut self, target: &TargetRef) -> bool {
        match target {
            TargetRef::Plan { target } => self.clear_target::<Plan>(target),
            TargetRef::Bundle { target } => self.clear_target::<Bundle>(target),
            TargetRef::Channel { target } => self.clear_target::<Channel>(target),
        }
    }

    /// Drop every patch
    pub fn clear(&mut self) {
        self.plan.clear();
        self.bundle.clear();
        self.channel.clear();
    }

    /// No pending patches of any schema
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty() && self.bundle.is_empty() && self.channel.is_empty()
    }

    /// Number of patched targets across all schemas
    #[inline]
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.plan.len() + self.bundle.len() + self.channel.len()
    }
}

/// Field edit carrying its entity type at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", rename_all = "lowercase")]
pub enum FieldEdit {
    /// Plan field
    Plan {
        /// Plan id
        target: EntityId,
        /// Field
        field: PlanField,
        /// New value
        value: FieldValue,
        /// Baseline value
        original: FieldValue,
    },
    /// Bundle field, scoped to one plan row
    Bundle {
        /// Row key
        target: LinkKey,
        /// Field
        field: BundleField,
        /// New value
        value: FieldValue,
        /// Baseline value
        original: FieldValue,
    },
    /// Channel field
    Channel {
        /// Channel or row key
        target: ChannelTarget,
        /// Field
        field: ChannelField,
        /// New value
        value: FieldValue,
        /// Baseline value
        original: FieldValue,
    },
}

impl FieldEdit {
    /// Schema of the target
    #[inline]
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Plan { .. } => EntityType::Plan,
            Self::Bundle { .. } => EntityType::Bundle,
            Self::Channel { .. } => EntityType::Channel,
        }
    }
}

/// Patch target carrying its entity type at runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entityType", rename_all = "lowercase")]
pub enum TargetRef {
    /// Plan id
    Plan {
        /// Plan id
        target: EntityId,
    },
    /// Bundle row
    Bundle {
        /// Row key
        target: LinkKey,
    },
    /// Channel or channel row
    Channel {
        /// Channel or row key
        target: ChannelTarget,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p1() -> EntityId {
        EntityId::from("p1")
    }

    #[test]
    fn patch_then_revert_leaves_space_empty() {
        let mut space = DraftSpace::new();
        space
            .patch_field::<Plan>(p1(), PlanField::BasePrice, 15.0.into(), 10.0.into())
            .unwrap();
        assert!(!space.is_empty());
        assert!(space.has_field::<Plan>(&p1(), PlanField::BasePrice));

        space
            .patch_field::<Plan>(p1(), PlanField::BasePrice, 10.0.into(), 10.0.into())
            .unwrap();
        assert!(space.is_empty());
        assert!(space.patch::<Plan>(&p1()).is_none());
    }

    #[test]
    fn revert_keeps_other_fields() {
        let mut space = DraftSpace::new();
        space
            .patch_field::<Plan>(p1(), PlanField::BasePrice, 15.0.into(), 10.0.into())
            .unwrap();
        space
            .patch_field::<Plan>(p1(), PlanField::Name, "Gold".into(), "Basic".into())
            .unwrap();
        space
            .patch_field::<Plan>(p1(), PlanField::BasePrice, 10.0.into(), 10.0.into())
            .unwrap();

        let patch = space.patch::<Plan>(&p1()).unwrap();
        assert_eq!(patch.fields().collect::<Vec<_>>(), vec![PlanField::Name]);
    }

    #[test]
    fn replace_with_empty_patch_removes_target() {
        let mut space = DraftSpace::new();
        let key = LinkKey::first("p1", "b1");
        let patch = Patch::<Bundle>::from_entries([(BundleField::Price, 4.0.into())]).unwrap();
        space.replace_patch::<Bundle>(key.clone(), patch);
        assert_eq!(space.target_count(), 1);

        space.replace_patch::<Bundle>(key.clone(), Patch::new());
        assert!(space.patch::<Bundle>(&key).is_none());
    }

    #[test]
    fn channel_targets_are_distinct() {
        let mut space = DraftSpace::new();
        let global = ChannelTarget::Channel("c1".into());
        let scoped = ChannelTarget::Link(LinkKey::first("b1", "c1"));
        space
            .patch_field::<Channel>(global.clone(), ChannelField::Hd, true.into(), false.into())
            .unwrap();
        space
            .patch_field::<Channel>(scoped.clone(), ChannelField::Number, 7_i64.into(), 5_i64.into())
            .unwrap();

        assert_eq!(space.patches::<Channel>().len(), 2);
        assert!(space.clear_target::<Channel>(&global));
        assert!(!space.clear_target::<Channel>(&global));
        assert!(space.patch::<Channel>(&scoped).is_some());
    }

    #[test]
    fn tagged_edit_deserializes_and_applies() {
        let edit: FieldEdit = serde_json::from_value(serde_json::json!({
            "entityType": "plan",
            "target": "p1",
            "field": "basePrice",
            "value": 15,
            "original": 10
        }))
        .unwrap();
        assert_eq!(edit.entity_type(), EntityType::Plan);

        let mut space = DraftSpace::new();
        assert_eq!(space.apply(edit).unwrap(), PatchOutcome::Set);
        assert_eq!(
            space.patch::<Plan>(&p1()).unwrap().get(PlanField::BasePrice),
            Some(&FieldValue::Number(15.0))
        );
    }

    #[test]
    fn clear_resets_every_map() {
        let mut space = DraftSpace::new();
        space
            .patch_field::<Plan>(p1(), PlanField::Active, false.into(), true.into())
            .unwrap();
        space
            .patch_field::<Bundle>(LinkKey::first("p1", "b1"), BundleField::Active, false.into(), true.into())
            .unwrap();
        space.clear();
        assert!(space.is_empty());
    }
}
