//! Relationship add/remove tracking
//!
//! Pending membership changes are held as two sets per owner: ids to add
//! and ids to remove. A toggle against the opposite set cancels the pending
//! entry instead of creating a new one, so a pair is never in both sets.

use composer_catalog::{EntityId, Relation};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a membership toggle did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToggleOutcome {
    /// New entry staged in the requested set
    Staged,
    /// Entry removed from the opposite set, undoing an earlier toggle
    Undone,
    /// Already staged; nothing changed
    AlreadyStaged,
}

/// Add/remove sets of one relation, keyed by owner
///
/// Sets keep insertion order so newly added items render in the order the
/// user picked them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationSets {
    #[serde(default)]
    to_add: BTreeMap<EntityId, IndexSet<EntityId>>,
    #[serde(default)]
    to_remove: BTreeMap<EntityId, IndexSet<EntityId>>,
}

impl RelationSets {
    /// Empty sets
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `related` for addition under `owner`
    ///
    /// A pending removal of `related` is undone instead; the relationship
    /// already exists in baseline so it is not added to the add-set.
    pub fn toggle_add(&mut self, owner: &EntityId, related: &EntityId) -> ToggleOutcome {
        if take(&mut self.to_remove, owner, related) {
            return ToggleOutcome::Undone;
        }
        if put(&mut self.to_add, owner, related) {
            ToggleOutcome::Staged
        } else {
            ToggleOutcome::AlreadyStaged
        }
    }

    /// Stage `related` for removal from `owner`
    ///
    /// A pending addition of `related` is cancelled instead; no remove entry
    /// is created for a relationship that was never committed.
    pub fn toggle_remove(&mut self, owner: &EntityId, related: &EntityId) -> ToggleOutcome {
        if take(&mut self.to_add, owner, related) {
            return ToggleOutcome::Undone;
        }
        if put(&mut self.to_remove, owner, related) {
            ToggleOutcome::Staged
        } else {
            ToggleOutcome::AlreadyStaged
        }
    }

    /// Ids staged for addition under `owner`, insertion order
    #[must_use]
    pub fn added(&self, owner: &EntityId) -> Option<&IndexSet<EntityId>> {
        self.to_add.get(owner)
    }

    /// Ids staged for removal from `owner`, insertion order
    #[must_use]
    pub fn removed(&self, owner: &EntityId) -> Option<&IndexSet<EntityId>> {
        self.to_remove.get(owner)
    }

    /// Whether `related` is staged for addition under `owner`
    #[must_use]
    pub fn is_added(&self, owner: &EntityId, related: &EntityId) -> bool {
        self.added(owner).is_some_and(|s| s.contains(related))
    }

    /// Whether `related` is staged for removal from `owner`
    #[must_use]
    pub fn is_removed(&self, owner: &EntityId, related: &EntityId) -> bool {
        self.removed(owner).is_some_and(|s| s.contains(related))
    }

    /// Owner → ids to add
    #[inline]
    #[must_use]
    pub fn to_add(&self) -> &BTreeMap<EntityId, IndexSet<EntityId>> {
        &self.to_add
    }

    /// Owner → ids to remove
    #[inline]
    #[must_use]
    pub fn to_remove(&self) -> &BTreeMap<EntityId, IndexSet<EntityId>> {
        &self.to_remove
    }

    /// No pending entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Drop every pending entry
    pub fn clear(&mut self) {
        self.to_add.clear();
        self.to_remove.clear();
    }

    /// Remove pairs found in both sets
    ///
    /// Can only happen when a caller edits the maps without going through
    /// the toggles. Returns the repaired pairs.
    pub fn reconcile(&mut self) -> Vec<(EntityId, EntityId)> {
        let mut conflicts = Vec::new();
        for (owner, added) in &self.to_add {
            if let Some(removed) = self.to_remove.get(owner) {
                conflicts.extend(
                    added
                        .iter()
                        .filter(|id| removed.contains(*id))
                        .map(|id| (owner.clone(), id.clone())),
                );
            }
        }
        for (owner, related) in &conflicts {
            take(&mut self.to_add, owner, related);
            take(&mut self.to_remove, owner, related);
        }
        conflicts
    }

    /// Insert without reconciling
    ///
    /// Only for restoring externally produced state; prefer the toggles.
    #[doc(hidden)]
    pub fn insert_raw(&mut self, owner: &EntityId, related: &EntityId, add: bool) {
        let map = if add { &mut self.to_add } else { &mut self.to_remove };
        put(map, owner, related);
    }
}

/// Remove `related` from `owner`'s set; drop the set if it empties
fn take(map: &mut BTreeMap<EntityId, IndexSet<EntityId>>, owner: &EntityId, related: &EntityId) -> bool {
    let Some(set) = map.get_mut(owner) else {
        return false;
    };
    let removed = set.shift_remove(related);
    if set.is_empty() {
        map.remove(owner);
    }
    removed
}

/// Insert `related` into `owner`'s set
fn put(map: &mut BTreeMap<EntityId, IndexSet<EntityId>>, owner: &EntityId, related: &EntityId) -> bool {
    map.entry(owner.clone()).or_default().insert(related.clone())
}

/// Pending membership changes of one job across all relations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipDiff {
    relations: BTreeMap<Relation, RelationSets>,
}

impl RelationshipDiff {
    /// Empty diff
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an addition (or undo a pending removal)
    pub fn toggle_add(&mut self, relation: Relation, owner: &EntityId, related: &EntityId) -> ToggleOutcome {
        let outcome = self.relations.entry(relation).or_default().toggle_add(owner, related);
        self.prune(relation);
        tracing::debug!(%relation, %owner, %related, ?outcome, "toggle add");
        outcome
    }

    /// Stage a removal (or cancel a pending addition)
    pub fn toggle_remove(&mut self, relation: Relation, owner: &EntityId, related: &EntityId) -> ToggleOutcome {
        let outcome = self.relations.entry(relation).or_default().toggle_remove(owner, related);
        self.prune(relation);
        tracing::debug!(%relation, %owner, %related, ?outcome, "toggle remove");
        outcome
    }

    /// Sets of one relation, if any entry is pending
    #[inline]
    #[must_use]
    pub fn sets(&self, relation: Relation) -> Option<&RelationSets> {
        self.relations.get(&relation)
    }

    /// Relations with pending entries
    pub fn iter(&self) -> impl Iterator<Item = (Relation, &RelationSets)> {
        self.relations.iter().map(|(r, s)| (*r, s))
    }

    /// Whether `related` is staged for addition
    #[must_use]
    pub fn is_added(&self, relation: Relation, owner: &EntityId, related: &EntityId) -> bool {
        self.sets(relation).is_some_and(|s| s.is_added(owner, related))
    }

    /// Whether `related` is staged for removal
    #[must_use]
    pub fn is_removed(&self, relation: Relation, owner: &EntityId, related: &EntityId) -> bool {
        self.sets(relation).is_some_and(|s| s.is_removed(owner, related))
    }

    /// No pending entries in any relation
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.relations.values().all(RelationSets::is_empty)
    }

    /// Drop every pending entry
    pub fn clear(&mut self) {
        self.relations.clear();
    }

    /// Repair pairs found in both sets of a relation
    pub fn reconcile(&mut self) -> Vec<(Relation, EntityId, EntityId)> {
        let mut repaired = Vec::new();
        for (relation, sets) in &mut self.relations {
            for (owner, related) in sets.reconcile() {
                tracing::warn!(%relation, %owner, %related, "pair staged for both add and remove; dropped from both");
                repaired.push((*relation, owner, related));
            }
        }
        self.relations.retain(|_, s| !s.is_empty());
        repaired
    }

    /// Mutable sets of one relation for restoring external state
    #[doc(hidden)]
    pub fn sets_mut(&mut self, relation: Relation) -> &mut RelationSets {
        self.relations.entry(relation).or_default()
    }

    fn prune(&mut self, relation: Relation) {
        if self.relations.get(&relation).is_some_and(RelationSets::is_empty) {
            self.relations.remove(&relation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::from(s)
    }

    #[test]
    fn add_then_remove_cancels() {
        let mut sets = RelationSets::new();
        assert_eq!(sets.toggle_add(&id("p1"), &id("b3")), ToggleOutcome::Staged);
        assert_eq!(sets.toggle_remove(&id("p1"), &id("b3")), ToggleOutcome::Undone);
        assert!(sets.is_empty());
        assert!(sets.added(&id("p1")).is_none());
        assert!(sets.removed(&id("p1")).is_none());
    }

    #[test]
    fn remove_then_add_restores() {
        let mut sets = RelationSets::new();
        sets.toggle_remove(&id("p1"), &id("b1"));
        assert!(sets.is_removed(&id("p1"), &id("b1")));
        assert_eq!(sets.toggle_add(&id("p1"), &id("b1")), ToggleOutcome::Undone);
        assert!(!sets.is_added(&id("p1"), &id("b1")));
        assert!(sets.is_empty());
    }

    #[test]
    fn repeated_add_does_not_grow() {
        let mut sets = RelationSets::new();
        sets.toggle_add(&id("p1"), &id("b3"));
        assert_eq!(sets.toggle_add(&id("p1"), &id("b3")), ToggleOutcome::AlreadyStaged);
        assert_eq!(sets.added(&id("p1")).map(IndexSet::len), Some(1));
    }

    #[test]
    fn added_keeps_insertion_order() {
        let mut sets = RelationSets::new();
        for r in ["b9", "b2", "b5"] {
            sets.toggle_add(&id("p1"), &id(r));
        }
        sets.toggle_remove(&id("p1"), &id("b2"));
        sets.toggle_add(&id("p1"), &id("b2"));
        let order: Vec<&str> = sets.added(&id("p1")).unwrap().iter().map(EntityId::as_str).collect();
        assert_eq!(order, vec!["b9", "b5", "b2"]);
    }

    #[test]
    fn reconcile_drops_pairs_in_both_sets() {
        let mut diff = RelationshipDiff::new();
        diff.sets_mut(Relation::PlanBundles).insert_raw(&id("p1"), &id("b1"), true);
        diff.sets_mut(Relation::PlanBundles).insert_raw(&id("p1"), &id("b1"), false);
        diff.sets_mut(Relation::PlanBundles).insert_raw(&id("p1"), &id("b2"), true);

        let repaired = diff.reconcile();
        assert_eq!(repaired, vec![(Relation::PlanBundles, id("p1"), id("b1"))]);
        assert!(!diff.is_added(Relation::PlanBundles, &id("p1"), &id("b1")));
        assert!(!diff.is_removed(Relation::PlanBundles, &id("p1"), &id("b1")));
        assert!(diff.is_added(Relation::PlanBundles, &id("p1"), &id("b2")));
    }

    #[test]
    fn relations_are_independent() {
        let mut diff = RelationshipDiff::new();
        diff.toggle_add(Relation::PlanChannels, &id("p1"), &id("c1"));
        diff.toggle_remove(Relation::BundleChannels, &id("b1"), &id("c1"));
        assert!(diff.is_added(Relation::PlanChannels, &id("p1"), &id("c1")));
        assert!(diff.is_removed(Relation::BundleChannels, &id("b1"), &id("c1")));
        assert!(diff.sets(Relation::PlanBundles).is_none());
    }

    #[test]
    fn emptied_relation_is_pruned() {
        let mut diff = RelationshipDiff::new();
        diff.toggle_add(Relation::PlanChannels, &id("p1"), &id("c1"));
        diff.toggle_remove(Relation::PlanChannels, &id("p1"), &id("c1"));
        assert!(diff.is_empty());
        assert_eq!(diff.iter().count(), 0);
    }
}
