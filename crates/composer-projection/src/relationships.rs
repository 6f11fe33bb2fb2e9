//! Relationship list projection
//!
//! Baseline rows render in `sort_index` order with removed rows kept and
//! flagged (soft delete); added ids follow in the order they were staged.

use composer_catalog::{keyed_rows, EntityId, LinkKey, LinkRow};
use composer_draft::RelationSets;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How an item relates to baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Membership {
    /// Present in baseline and kept
    Baseline,
    /// Staged for addition
    Added,
    /// Present in baseline, staged for removal
    Removed,
}

/// One rendered relationship item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipItem<R> {
    /// Related entity
    pub related_id: EntityId,
    /// Row key for row-scoped patches
    pub key: LinkKey,
    /// Baseline position; `None` for added items
    pub sort_index: Option<u32>,
    /// Baseline/added/removed
    pub membership: Membership,
    /// Related record, if known
    pub record: Option<R>,
}

/// Projected relationship list of one owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipList<R> {
    /// Items in render order
    pub items: Vec<RelationshipItem<R>>,
    /// Ids staged for addition, staging order
    pub added_ids: Vec<EntityId>,
    /// Ids staged for removal, staging order
    pub removed_ids: Vec<EntityId>,
}

impl<R> RelationshipList<R> {
    /// Items that will exist after submit
    pub fn effective(&self) -> impl Iterator<Item = &RelationshipItem<R>> {
        self.items.iter().filter(|i| i.membership != Membership::Removed)
    }

    /// Any pending change for this owner
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.added_ids.is_empty() || !self.removed_ids.is_empty()
    }
}

/// Project baseline rows of `owner` with its pending add/remove sets
///
/// `related_by_id` resolves related records; unresolved ids still render
/// with `record: None`. An added id that is already a kept baseline row is
/// not duplicated.
pub fn project_relationship_list<R>(
    owner: &EntityId,
    baseline_rows: &[LinkRow],
    sets: Option<&RelationSets>,
    related_by_id: impl Fn(&EntityId) -> Option<R>,
) -> RelationshipList<R> {
    let removed: Vec<EntityId> = sets
        .and_then(|s| s.removed(owner))
        .map(|s| s.iter().cloned().collect())
        .unwrap_or_default();
    let added: Vec<EntityId> = sets
        .and_then(|s| s.added(owner))
        .map(|s| s.iter().cloned().collect())
        .unwrap_or_default();
    let removed_set: BTreeSet<&EntityId> = removed.iter().collect();

    let mut occurrences: BTreeMap<EntityId, u32> = BTreeMap::new();
    let mut kept: BTreeSet<EntityId> = BTreeSet::new();
    let mut items = Vec::new();

    for (key, row) in keyed_rows(baseline_rows, owner) {
        *occurrences.entry(row.related.clone()).or_insert(0) += 1;
        let membership = if removed_set.contains(&row.related) {
            Membership::Removed
        } else {
            kept.insert(row.related.clone());
            Membership::Baseline
        };
        items.push(RelationshipItem {
            related_id: row.related.clone(),
            key,
            sort_index: Some(row.sort_index),
            membership,
            record: related_by_id(&row.related),
        });
    }

    for id in &added {
        if kept.contains(id) {
            continue;
        }
        let occurrence = occurrences.get(id).copied().unwrap_or(0);
        items.push(RelationshipItem {
            related_id: id.clone(),
            key: LinkKey::new(owner.clone(), id.clone(), occurrence),
            sort_index: None,
            membership: Membership::Added,
            record: related_by_id(id),
        });
    }

    RelationshipList {
        items,
        added_ids: added,
        removed_ids: removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rows() -> Vec<LinkRow> {
        vec![
            LinkRow::new("p1", "b2", 1),
            LinkRow::new("p1", "b1", 0),
            LinkRow::new("p2", "b9", 0),
        ]
    }

    fn ids<R>(list: &RelationshipList<R>) -> Vec<(&str, Membership)> {
        list.items
            .iter()
            .map(|i| (i.related_id.as_str(), i.membership))
            .collect()
    }

    #[test]
    fn baseline_only_in_sort_order() {
        let list = project_relationship_list(&"p1".into(), &rows(), None, |_| None::<()>);
        assert_eq!(
            ids(&list),
            vec![("b1", Membership::Baseline), ("b2", Membership::Baseline)]
        );
        assert!(!list.is_dirty());
    }

    #[test]
    fn removed_kept_and_added_appended() {
        let mut sets = RelationSets::new();
        let owner = EntityId::from("p1");
        sets.toggle_remove(&owner, &"b1".into());
        sets.toggle_add(&owner, &"b7".into());
        sets.toggle_add(&owner, &"b3".into());

        let list = project_relationship_list(&owner, &rows(), Some(&sets), |id| Some(id.to_string()));
        assert_eq!(
            ids(&list),
            vec![
                ("b1", Membership::Removed),
                ("b2", Membership::Baseline),
                ("b7", Membership::Added),
                ("b3", Membership::Added),
            ]
        );
        assert_eq!(list.added_ids, vec![EntityId::from("b7"), EntityId::from("b3")]);
        assert_eq!(list.removed_ids, vec![EntityId::from("b1")]);
        assert_eq!(list.effective().count(), 3);
        assert_eq!(list.items[2].record.as_deref(), Some("b7"));
        assert_eq!(list.items[2].sort_index, None);
    }

    #[test]
    fn re_adding_a_removed_row_gets_next_occurrence() {
        let mut sets = RelationSets::new();
        let owner = EntityId::from("p1");
        sets.insert_raw(&owner, &"b1".into(), false);
        sets.insert_raw(&owner, &"b1".into(), true);

        let list = project_relationship_list(&owner, &rows(), Some(&sets), |_| None::<()>);
        let added = list.items.iter().find(|i| i.membership == Membership::Added).unwrap();
        assert_eq!(added.key, LinkKey::new("p1", "b1", 1));
    }

    #[test]
    fn added_id_already_in_baseline_not_duplicated() {
        let mut sets = RelationSets::new();
        let owner = EntityId::from("p1");
        sets.toggle_add(&owner, &"b2".into());

        let list = project_relationship_list(&owner, &rows(), Some(&sets), |_| None::<()>);
        assert_eq!(list.items.len(), 2);
        assert!(list.items.iter().all(|i| i.membership == Membership::Baseline));
        assert_eq!(list.added_ids, vec![EntityId::from("b2")]);
        assert!(list.is_dirty());
    }
}
