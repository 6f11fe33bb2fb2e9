//! Composer Draft
//!
//! Pending edits of one job, held as deltas against an immutable baseline.
//!
//! # Core Concepts
//!
//! - [`Patch<T>`]: the changed fields of one record, never the whole record
//! - [`DraftSpace`]: patches per schema, keyed by id, row key or channel target
//! - [`RelationshipDiff`]: add/remove sets per relation and owner
//!
//! # Example
//!
//! ```rust,ignore
//! use composer_draft::{DraftSpace, RelationshipDiff};
//! use composer_catalog::{Plan, PlanField, Relation};
//!
//! let mut space = DraftSpace::new();
//! space.patch_field::<Plan>("p1".into(), PlanField::BasePrice, 15.0.into(), 10.0.into())?;
//!
//! let mut diff = RelationshipDiff::new();
//! diff.toggle_add(Relation::PlanBundles, &"p1".into(), &"b3".into());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod patch;
mod relations;
mod space;

pub use error::PatchError;
pub use patch::{Patch, PatchOutcome};
pub use relations::{RelationSets, RelationshipDiff, ToggleOutcome};
pub use space::{ChannelTarget, DraftSpace, Drafted, FieldEdit, TargetRef};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use composer_catalog::{EntityId, LinkKey, Plan, PlanField, Relation};

    #[test]
    fn patches_and_relations_clear_independently() {
        let mut space = DraftSpace::new();
        let mut diff = RelationshipDiff::new();
        let p1 = EntityId::from("p1");

        space
            .patch_field::<Plan>(p1.clone(), PlanField::Tier, 3_i64.into(), 1_i64.into())
            .unwrap();
        diff.toggle_add(Relation::PlanBundles, &p1, &EntityId::from("b3"));

        space.clear();
        assert!(space.is_empty());
        assert!(!diff.is_empty());
    }

    #[test]
    fn target_ref_round_trip_clears() {
        let mut space = DraftSpace::new();
        let key = LinkKey::first("p1", "b1");
        space
            .patch_field::<composer_catalog::Bundle>(
                key.clone(),
                composer_catalog::BundleField::Price,
                5.0.into(),
                4.0.into(),
            )
            .unwrap();

        let target: TargetRef = serde_json::from_value(serde_json::json!({
            "entityType": "bundle",
            "target": { "owner": "p1", "related": "b1", "occurrence": 0 }
        }))
        .unwrap();
        assert!(space.clear_target_ref(&target));
        assert!(space.is_empty());
    }
}
