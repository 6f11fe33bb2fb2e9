//! Relationship link rows and occurrence-scoped link keys
//!
//! The same related entity may appear more than once under one owner (two
//! rows for the same bundle at different positions). Edits scoped to one
//! row are keyed by [`LinkKey`], which identifies the row by its
//! occurrence ordinal rather than by its raw `sort_index`.

use crate::entity::{EntityId, EntityType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Membership relation between two entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    /// Bundles offered under a plan
    PlanBundles,
    /// Channels included directly in a plan
    PlanChannels,
    /// Channels carried by a bundle
    BundleChannels,
}

impl Relation {
    /// All relations
    pub const ALL: [Self; 3] = [Self::PlanBundles, Self::PlanChannels, Self::BundleChannels];

    /// Kind of the owning side
    #[inline]
    #[must_use]
    pub fn owner_type(self) -> EntityType {
        match self {
            Self::PlanBundles | Self::PlanChannels => EntityType::Plan,
            Self::BundleChannels => EntityType::Bundle,
        }
    }

    /// Kind of the related side
    #[inline]
    #[must_use]
    pub fn related_type(self) -> EntityType {
        match self {
            Self::PlanBundles => EntityType::Bundle,
            Self::PlanChannels | Self::BundleChannels => EntityType::Channel,
        }
    }

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlanBundles => "plan-bundles",
            Self::PlanChannels => "plan-channels",
            Self::BundleChannels => "bundle-channels",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a link table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRow {
    /// Owning entity (plan or bundle)
    pub owner: EntityId,
    /// Related entity (bundle or channel)
    pub related: EntityId,
    /// Explicit display position under the owner
    pub sort_index: u32,
}

impl LinkRow {
    /// Create row
    #[inline]
    #[must_use]
    pub fn new(owner: impl Into<EntityId>, related: impl Into<EntityId>, sort_index: u32) -> Self {
        Self {
            owner: owner.into(),
            related: related.into(),
            sort_index,
        }
    }
}

/// Key of one relationship row within a job
///
/// `occurrence` counts earlier rows with the same `(owner, related)` pair
/// under this owner, in `sort_index` order. Renumbering sort indices keeps
/// the key stable as long as duplicate rows keep their relative order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkKey {
    /// Owning entity
    pub owner: EntityId,
    /// Related entity
    pub related: EntityId,
    /// Ordinal among rows with the same pair
    pub occurrence: u32,
}

impl LinkKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(owner: impl Into<EntityId>, related: impl Into<EntityId>, occurrence: u32) -> Self {
        Self {
            owner: owner.into(),
            related: related.into(),
            occurrence,
        }
    }

    /// Key of the first occurrence of a pair
    #[inline]
    #[must_use]
    pub fn first(owner: impl Into<EntityId>, related: impl Into<EntityId>) -> Self {
        Self::new(owner, related, 0)
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.owner, self.related, self.occurrence)
    }
}

/// Rows of `owner`, ordered by `sort_index`, each paired with its key
///
/// Ties on `sort_index` keep table order.
#[must_use]
pub fn keyed_rows<'a>(rows: &'a [LinkRow], owner: &EntityId) -> Vec<(LinkKey, &'a LinkRow)> {
    let mut owned: Vec<&LinkRow> = rows.iter().filter(|r| &r.owner == owner).collect();
    owned.sort_by_key(|r| r.sort_index);

    let mut seen: HashMap<&EntityId, u32> = HashMap::new();
    owned
        .into_iter()
        .map(|row| {
            let count = seen.entry(&row.related).or_insert(0);
            let key = LinkKey::new(row.owner.clone(), row.related.clone(), *count);
            *count += 1;
            (key, row)
        })
        .collect()
}
