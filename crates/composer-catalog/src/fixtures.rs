//! Seeded mock catalog generation
//!
//! Produces deterministic catalogs for demos and tests. The same config
//! always yields the same snapshot.

use crate::link::{LinkRow, Relation};
use crate::snapshot::CatalogSnapshot;
use crate::types::{Bundle, Channel, Plan};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const PLAN_NAMES: &[&str] = &["Starter", "Basic", "Family", "Premium", "Ultimate"];
const BUNDLE_NAMES: &[&str] = &["Sports", "Movies", "Kids", "News", "Music", "Docs"];
const GENRES: &[&str] = &["news", "sports", "movies", "kids", "music", "documentary"];

/// Shape of a generated catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureConfig {
    /// Number of plans
    pub plans: usize,
    /// Number of bundles
    pub bundles: usize,
    /// Number of channels
    pub channels: usize,
    /// RNG seed
    pub seed: u64,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            plans: 5,
            bundles: 6,
            channels: 40,
            seed: 42,
        }
    }
}

/// Generate a catalog
///
/// Plan `i` gets tier `i`; every plan links a random subset of bundles and
/// channels; every bundle carries a random subset of channels.
#[must_use]
pub fn generate_catalog(config: &FixtureConfig) -> CatalogSnapshot {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut snapshot = CatalogSnapshot::new();

    for i in 0..config.channels {
        let mut channel = Channel::new(
            format!("c{}", i + 1),
            format!("Channel {}", i + 1),
            i64::try_from(i + 1).unwrap_or(i64::MAX),
        );
        channel.genre = GENRES[rng.random_range(0..GENRES.len())].to_string();
        channel.hd = rng.random_bool(0.6);
        snapshot = snapshot.with_channel(channel);
    }

    for i in 0..config.bundles {
        let name = BUNDLE_NAMES[i % BUNDLE_NAMES.len()];
        let price = f64::from(rng.random_range(3_u32..15)) - 0.01;
        let bundle_id = format!("b{}", i + 1);
        snapshot = snapshot.with_bundle(Bundle::new(bundle_id.clone(), name, price));

        let mut sort_index = 0;
        for c in 0..config.channels {
            if rng.random_bool(0.2) {
                snapshot = snapshot.with_link(
                    Relation::BundleChannels,
                    LinkRow::new(bundle_id.clone(), format!("c{}", c + 1), sort_index),
                );
                sort_index += 1;
            }
        }
    }

    for i in 0..config.plans {
        let name = PLAN_NAMES[i % PLAN_NAMES.len()];
        let tier = i64::try_from(i).unwrap_or(i64::MAX);
        let price = f64::from(rng.random_range(8_u32..60)) - 0.01;
        let plan_id = format!("p{}", i + 1);
        snapshot = snapshot.with_plan(Plan::new(plan_id.clone(), name, price).with_tier(tier));

        let mut sort_index = 0;
        for b in 0..config.bundles {
            if rng.random_bool(0.5) {
                snapshot = snapshot.with_link(
                    Relation::PlanBundles,
                    LinkRow::new(plan_id.clone(), format!("b{}", b + 1), sort_index),
                );
                sort_index += 1;
            }
        }

        let mut sort_index = 0;
        for c in 0..config.channels {
            if rng.random_bool(0.15) {
                snapshot = snapshot.with_link(
                    Relation::PlanChannels,
                    LinkRow::new(plan_id.clone(), format!("c{}", c + 1), sort_index),
                );
                sort_index += 1;
            }
        }
    }

    snapshot
}
