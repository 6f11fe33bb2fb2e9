//! Immutable baseline snapshots returned by the catalog service

use crate::entity::{Entity, EntityId};
use crate::link::{keyed_rows, LinkKey, LinkRow, Relation};
use crate::types::{Bundle, Channel, Plan};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Baseline catalog data for a set of plans
///
/// Treated as read-only for the lifetime of a job. A re-fetch produces a new
/// snapshot that replaces the old one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    #[serde(default)]
    plans: BTreeMap<EntityId, Plan>,
    #[serde(default)]
    bundles: BTreeMap<EntityId, Bundle>,
    #[serde(default)]
    channels: BTreeMap<EntityId, Channel>,
    #[serde(default)]
    links: BTreeMap<Relation, Vec<LinkRow>>,
}

/// Per-schema table lookup on a snapshot
pub trait SnapshotTable: Entity {
    /// Table holding records of this schema
    fn table(snapshot: &CatalogSnapshot) -> &BTreeMap<EntityId, Self>;
}

impl SnapshotTable for Plan {
    fn table(snapshot: &CatalogSnapshot) -> &BTreeMap<EntityId, Self> {
        &snapshot.plans
    }
}

impl SnapshotTable for Bundle {
    fn table(snapshot: &CatalogSnapshot) -> &BTreeMap<EntityId, Self> {
        &snapshot.bundles
    }
}

impl SnapshotTable for Channel {
    fn table(snapshot: &CatalogSnapshot) -> &BTreeMap<EntityId, Self> {
        &snapshot.channels
    }
}

impl CatalogSnapshot {
    /// Empty snapshot
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With plan
    #[must_use]
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plans.insert(plan.id.clone(), plan);
        self
    }

    /// With bundle
    #[must_use]
    pub fn with_bundle(mut self, bundle: Bundle) -> Self {
        self.bundles.insert(bundle.id.clone(), bundle);
        self
    }

    /// With channel
    #[must_use]
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channels.insert(channel.id.clone(), channel);
        self
    }

    /// With link row
    #[must_use]
    pub fn with_link(mut self, relation: Relation, row: LinkRow) -> Self {
        self.links.entry(relation).or_default().push(row);
        self
    }

    /// Record of any schema by id
    #[inline]
    #[must_use]
    pub fn get<T: SnapshotTable>(&self, id: &EntityId) -> Option<&T> {
        T::table(self).get(id)
    }

    /// Full table of one schema
    #[inline]
    #[must_use]
    pub fn all<T: SnapshotTable>(&self) -> &BTreeMap<EntityId, T> {
        T::table(self)
    }

    /// Plan by id
    #[inline]
    #[must_use]
    pub fn plan(&self, id: &EntityId) -> Option<&Plan> {
        self.plans.get(id)
    }

    /// Bundle by id
    #[inline]
    #[must_use]
    pub fn bundle(&self, id: &EntityId) -> Option<&Bundle> {
        self.bundles.get(id)
    }

    /// Channel by id
    #[inline]
    #[must_use]
    pub fn channel(&self, id: &EntityId) -> Option<&Channel> {
        self.channels.get(id)
    }

    /// Plan ids in this snapshot
    pub fn plan_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.plans.keys()
    }

    /// All link rows of a relation, table order
    #[inline]
    #[must_use]
    pub fn links(&self, relation: Relation) -> &[LinkRow] {
        self.links.get(&relation).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Link rows of one owner with their keys, `sort_index` order
    #[must_use]
    pub fn keyed_links(&self, relation: Relation, owner: &EntityId) -> Vec<(LinkKey, &LinkRow)> {
        keyed_rows(self.links(relation), owner)
    }

    /// Distinct related ids of one owner, `sort_index` order
    #[must_use]
    pub fn related_ids(&self, relation: Relation, owner: &EntityId) -> Vec<EntityId> {
        let mut seen = BTreeSet::new();
        self.keyed_links(relation, owner)
            .into_iter()
            .filter(|(_, row)| seen.insert(row.related.clone()))
            .map(|(_, row)| row.related.clone())
            .collect()
    }

    /// Whether `owner` already has `related` in baseline
    #[must_use]
    pub fn has_link(&self, relation: Relation, owner: &EntityId, related: &EntityId) -> bool {
        self.links(relation)
            .iter()
            .any(|r| &r.owner == owner && &r.related == related)
    }

    /// Sub-snapshot for a set of plans
    ///
    /// Keeps the requested plans, their bundle and channel rows, the bundles
    /// they reference with those bundles' channel rows, and every channel
    /// reachable either way. Unknown ids are skipped.
    #[must_use]
    pub fn restrict_to(&self, plan_ids: &[EntityId]) -> Self {
        let plan_set: BTreeSet<&EntityId> = plan_ids.iter().collect();
        let mut out = Self::new();

        for id in plan_ids {
            if let Some(plan) = self.plans.get(id) {
                out.plans.insert(id.clone(), plan.clone());
            }
        }

        for relation in [Relation::PlanBundles, Relation::PlanChannels] {
            let rows: Vec<LinkRow> = self
                .links(relation)
                .iter()
                .filter(|r| plan_set.contains(&r.owner))
                .cloned()
                .collect();
            if !rows.is_empty() {
                out.links.insert(relation, rows);
            }
        }

        let bundle_ids: BTreeSet<EntityId> = out
            .links(Relation::PlanBundles)
            .iter()
            .map(|r| r.related.clone())
            .collect();
        for id in &bundle_ids {
            if let Some(bundle) = self.bundles.get(id) {
                out.bundles.insert(id.clone(), bundle.clone());
            }
        }

        let bundle_channel_rows: Vec<LinkRow> = self
            .links(Relation::BundleChannels)
            .iter()
            .filter(|r| bundle_ids.contains(&r.owner))
            .cloned()
            .collect();
        if !bundle_channel_rows.is_empty() {
            out.links.insert(Relation::BundleChannels, bundle_channel_rows);
        }

        let channel_ids: BTreeSet<EntityId> = out
            .links(Relation::PlanChannels)
            .iter()
            .chain(out.links(Relation::BundleChannels))
            .map(|r| r.related.clone())
            .collect();
        for id in channel_ids {
            if let Some(channel) = self.channels.get(&id) {
                out.channels.insert(id, channel.clone());
            }
        }

        out
    }

    /// Merge the channel and bundle tables of `other` into this snapshot
    ///
    /// Used when a job offers related entities that are not yet linked to
    /// any selected plan. Existing records win.
    pub fn absorb_related(&mut self, other: &Self) {
        for (id, bundle) in &other.bundles {
            self.bundles.entry(id.clone()).or_insert_with(|| bundle.clone());
        }
        for (id, channel) in &other.channels {
            self.channels.entry(id.clone()).or_insert_with(|| channel.clone());
        }
    }
}
