//! Catalog read service seam and its in-memory backend

use crate::entity::EntityId;
use crate::error::CatalogError;
use crate::snapshot::CatalogSnapshot;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Read-only access to catalog baseline data
#[async_trait]
pub trait CatalogService: Send + Sync + Debug {
    /// Baseline for a set of plans: plans, linked bundles and channels and
    /// every link row between them
    ///
    /// # Errors
    /// - `CatalogError::UnknownPlan` if any id is not in the catalog
    /// - `CatalogError::Unavailable` if the backend cannot be reached
    async fn fetch(&self, plan_ids: &[EntityId]) -> Result<CatalogSnapshot, CatalogError>;

    /// Bundle and channel records by id, without link rows
    ///
    /// Unknown ids are skipped.
    ///
    /// # Errors
    /// - `CatalogError::Unavailable` if the backend cannot be reached
    async fn fetch_related(
        &self,
        bundle_ids: &[EntityId],
        channel_ids: &[EntityId],
    ) -> Result<CatalogSnapshot, CatalogError>;
}

/// Catalog served from a fixed snapshot held in memory
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    data: Arc<CatalogSnapshot>,
    latency: Option<Duration>,
}

impl InMemoryCatalog {
    /// Serve `data`
    #[inline]
    #[must_use]
    pub fn new(data: CatalogSnapshot) -> Self {
        Self {
            data: Arc::new(data),
            latency: None,
        }
    }

    /// Delay every response, for exercising in-flight races
    #[inline]
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Load from the JSON form of [`CatalogSnapshot`]
    ///
    /// # Errors
    /// Returns `CatalogError::Decode` on malformed input
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Entire backing snapshot
    #[inline]
    #[must_use]
    pub fn data(&self) -> &CatalogSnapshot {
        &self.data
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalog {
    async fn fetch(&self, plan_ids: &[EntityId]) -> Result<CatalogSnapshot, CatalogError> {
        self.simulate_latency().await;

        if let Some(missing) = plan_ids.iter().find(|id| self.data.plan(id).is_none()) {
            return Err(CatalogError::UnknownPlan(missing.clone()));
        }

        tracing::debug!(plans = plan_ids.len(), "serving catalog baseline");
        Ok(self.data.restrict_to(plan_ids))
    }

    async fn fetch_related(
        &self,
        bundle_ids: &[EntityId],
        channel_ids: &[EntityId],
    ) -> Result<CatalogSnapshot, CatalogError> {
        self.simulate_latency().await;

        let mut out = CatalogSnapshot::new();
        for bundle in bundle_ids.iter().filter_map(|id| self.data.bundle(id)) {
            out = out.with_bundle(bundle.clone());
        }
        for channel in channel_ids.iter().filter_map(|id| self.data.channel(id)) {
            out = out.with_channel(channel.clone());
        }
        Ok(out)
    }
}
