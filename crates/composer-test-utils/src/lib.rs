//! Testing utilities for the composer workspace
//!
//! Shared fixtures, jobs and scripted validators.

#![allow(missing_docs)]

use async_trait::async_trait;
use composer_catalog::{Bundle, CatalogSnapshot, Channel, EntityId, LinkRow, Plan, PlanField, Relation};
use composer_jobs::{Job, JobArgs, JobId, NavigationRequest, NavigationValidator};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Small catalog used across scenario tests
///
/// - `p1` Basic, 10.0, tier 0; `p2` Premium, 30.0, tier 1
/// - `p1` carries `b1` then `b2`; `p2` carries `b2`
/// - `b3` exists but is linked to no plan
/// - `p1` carries channels `c1`, `c2`; `b1` carries `c2`, `c3`
pub fn sample_catalog() -> CatalogSnapshot {
    CatalogSnapshot::new()
        .with_plan(Plan::new("p1", "Basic", 10.0))
        .with_plan(Plan::new("p2", "Premium", 30.0).with_tier(1))
        .with_bundle(Bundle::new("b1", "Sports", 5.0))
        .with_bundle(Bundle::new("b2", "Movies", 7.0))
        .with_bundle(Bundle::new("b3", "Kids", 4.0))
        .with_channel(Channel::new("c1", "News 24", 101))
        .with_channel(Channel::new("c2", "Arena", 201))
        .with_channel(Channel::new("c3", "Arena Extra", 202))
        .with_channel(Channel::new("c4", "Cartoons", 301))
        .with_link(Relation::PlanBundles, LinkRow::new("p1", "b1", 0))
        .with_link(Relation::PlanBundles, LinkRow::new("p1", "b2", 1))
        .with_link(Relation::PlanBundles, LinkRow::new("p2", "b2", 0))
        .with_link(Relation::PlanChannels, LinkRow::new("p1", "c1", 0))
        .with_link(Relation::PlanChannels, LinkRow::new("p1", "c2", 1))
        .with_link(Relation::BundleChannels, LinkRow::new("b1", "c2", 0))
        .with_link(Relation::BundleChannels, LinkRow::new("b1", "c3", 1))
}

/// Same catalog with every `sort_index` shifted, as after a re-fetch
pub fn renumbered_catalog(offset: u32) -> CatalogSnapshot {
    let base = sample_catalog();
    let mut out = CatalogSnapshot::new();
    for plan in base.all::<Plan>().values() {
        out = out.with_plan(plan.clone());
    }
    for bundle in base.all::<Bundle>().values() {
        out = out.with_bundle(bundle.clone());
    }
    for channel in base.all::<Channel>().values() {
        out = out.with_channel(channel.clone());
    }
    for relation in Relation::ALL {
        for row in base.links(relation) {
            out = out.with_link(
                relation,
                LinkRow::new(row.owner.clone(), row.related.clone(), row.sort_index * 10 + offset),
            );
        }
    }
    out
}

pub fn ids(raw: &[&str]) -> Vec<EntityId> {
    raw.iter().map(|s| EntityId::from(*s)).collect()
}

pub fn plan_properties_job(plans: &[&str]) -> Job {
    Job::new(
        JobArgs::PlanProperties {
            property_keys: vec![PlanField::Name, PlanField::BasePrice, PlanField::Tier],
        },
        ids(plans),
    )
}

pub fn plan_bundles_job(plans: &[&str], offered: &[&str]) -> Job {
    Job::new(JobArgs::PlanBundles { bundle_ids: ids(offered) }, ids(plans))
}

/// Fixed job id for scripted scenarios
pub fn job_id(n: u8) -> JobId {
    format!("01J000000000000000000000{n:02}")
        .parse()
        .unwrap()
}

/// Validator replaying a fixed list of verdicts, then allowing
#[derive(Debug, Clone, Default)]
pub struct ScriptedValidator {
    verdicts: Arc<Mutex<VecDeque<bool>>>,
    seen: Arc<Mutex<Vec<NavigationRequest>>>,
}

impl ScriptedValidator {
    pub fn new(verdicts: impl IntoIterator<Item = bool>) -> Self {
        Self {
            verdicts: Arc::new(Mutex::new(verdicts.into_iter().collect())),
            seen: Arc::default(),
        }
    }

    /// Requests received so far
    pub fn seen(&self) -> Vec<NavigationRequest> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl NavigationValidator for ScriptedValidator {
    async fn validate(&self, request: NavigationRequest) -> anyhow::Result<bool> {
        self.seen.lock().push(request);
        Ok(self.verdicts.lock().pop_front().unwrap_or(true))
    }
}

/// Validator that waits until the test releases it
#[derive(Debug)]
pub struct GatedValidator {
    gate: Mutex<Option<oneshot::Receiver<bool>>>,
}

impl GatedValidator {
    /// Validator plus the sender that resolves it
    pub fn new() -> (Self, oneshot::Sender<bool>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                gate: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

#[async_trait]
impl NavigationValidator for GatedValidator {
    async fn validate(&self, _request: NavigationRequest) -> anyhow::Result<bool> {
        let rx = self.gate.lock().take();
        match rx {
            Some(rx) => Ok(rx.await?),
            None => Ok(true),
        }
    }
}
