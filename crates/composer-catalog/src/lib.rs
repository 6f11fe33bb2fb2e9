//! Composer Catalog
//!
//! Catalog records and the external collaborators the editing core reads
//! them from.
//!
//! # Core Concepts
//!
//! - [`Entity`]: sealed schema trait implemented by [`Plan`], [`Bundle`], [`Channel`]
//! - [`FieldValue`]: one field value, compared with NaN-equal strictness
//! - [`LinkRow`] / [`LinkKey`]: relationship rows and their occurrence-scoped keys
//! - [`CatalogSnapshot`]: immutable baseline for a set of plans
//! - [`CatalogService`] / [`LockService`]: external seams, with in-memory mocks
//!
//! # Example
//!
//! ```rust,ignore
//! use composer_catalog::{CatalogService, InMemoryCatalog, generate_catalog, FixtureConfig};
//!
//! let catalog = InMemoryCatalog::new(generate_catalog(&FixtureConfig::default()));
//! let baseline = catalog.fetch(&["p1".into()]).await?;
//! println!("{} bundles", baseline.all::<Bundle>().len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod entity;
mod error;
mod fixtures;
mod link;
mod lock;
mod service;
mod snapshot;
mod types;

pub use entity::{Entity, EntityField, EntityId, EntityType, FieldKind, FieldValue};
pub use error::CatalogError;
pub use fixtures::{generate_catalog, FixtureConfig};
pub use link::{keyed_rows, LinkKey, LinkRow, Relation};
pub use lock::{InMemoryLocks, LockOutcome, LockService, MasterJobHandle, MasterJobProgress};
pub use service::{CatalogService, InMemoryCatalog};
pub use snapshot::{CatalogSnapshot, SnapshotTable};
pub use types::{Bundle, BundleField, Channel, ChannelField, Plan, PlanField};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn generated_catalog_serves_every_plan() {
        let snapshot = generate_catalog(&FixtureConfig::default());
        let ids: Vec<EntityId> = snapshot.plan_ids().cloned().collect();
        let catalog = InMemoryCatalog::new(snapshot);

        let baseline = catalog.fetch(&ids).await.unwrap();
        assert_eq!(baseline.all::<Plan>().len(), ids.len());
        for id in &ids {
            for row in baseline.links(Relation::PlanBundles).iter().filter(|r| &r.owner == id) {
                assert!(baseline.bundle(&row.related).is_some());
            }
        }
    }

    #[test]
    fn entity_type_tags() {
        assert_eq!(<Plan as Entity>::ENTITY_TYPE, EntityType::Plan);
        assert_eq!(<Bundle as Entity>::ENTITY_TYPE, EntityType::Bundle);
        assert_eq!(<Channel as Entity>::ENTITY_TYPE, EntityType::Channel);
    }
}
