//! Cached baseline loading
//!
//! Baselines are keyed by the exact id sets a job asks for. Freshness is
//! bounded by the configured TTL; stale-response protection lives in the
//! session, which tags each request with a generation.

use crate::config::ComposerConfig;
use composer_catalog::{CatalogError, CatalogService, CatalogSnapshot, EntityId};
use moka::future::Cache;
use std::sync::Arc;

/// What a baseline was fetched for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaselineKey {
    plans: Vec<EntityId>,
    bundles: Vec<EntityId>,
    channels: Vec<EntityId>,
}

impl BaselineKey {
    /// Normalized key: sorted, deduplicated
    #[must_use]
    pub fn new(plans: &[EntityId], bundles: &[EntityId], channels: &[EntityId]) -> Self {
        let norm = |ids: &[EntityId]| {
            let mut v = ids.to_vec();
            v.sort();
            v.dedup();
            v
        };
        Self {
            plans: norm(plans),
            bundles: norm(bundles),
            channels: norm(channels),
        }
    }

    #[inline]
    #[must_use]
    pub fn plans(&self) -> &[EntityId] {
        &self.plans
    }
}

/// Catalog reads through a TTL cache
#[derive(Debug, Clone)]
pub struct BaselineLoader {
    catalog: Arc<dyn CatalogService>,
    cache: Cache<BaselineKey, Arc<CatalogSnapshot>>,
}

impl BaselineLoader {
    /// Loader sized by `config`
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogService>, config: &ComposerConfig) -> Self {
        Self {
            catalog,
            cache: Cache::builder()
                .max_capacity(config.baseline_cache_capacity)
                .time_to_live(config.baseline_ttl())
                .build(),
        }
    }

    /// Baseline for `key`, from cache or the catalog
    ///
    /// Offered bundles and channels that are not linked to any of the plans
    /// are fetched separately and folded in.
    ///
    /// # Errors
    /// Propagates the catalog error; failures are not cached
    pub async fn load(&self, key: BaselineKey) -> Result<Arc<CatalogSnapshot>, CatalogError> {
        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!(plans = key.plans.len(), "baseline cache hit");
            return Ok(cached);
        }

        let mut snapshot = self.catalog.fetch(&key.plans).await?;
        if !key.bundles.is_empty() || !key.channels.is_empty() {
            let related = self.catalog.fetch_related(&key.bundles, &key.channels).await?;
            snapshot.absorb_related(&related);
        }
        let snapshot = Arc::new(snapshot);
        self.cache.insert(key, Arc::clone(&snapshot)).await;
        Ok(snapshot)
    }

    /// Drop every cached baseline
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate cached entries
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use composer_catalog::{Bundle, Plan};
    use mockall::mock;

    mock! {
        Catalog {}

        #[async_trait]
        impl CatalogService for Catalog {
            async fn fetch(&self, plan_ids: &[EntityId]) -> Result<CatalogSnapshot, CatalogError>;
            async fn fetch_related(
                &self,
                bundle_ids: &[EntityId],
                channel_ids: &[EntityId],
            ) -> Result<CatalogSnapshot, CatalogError>;
        }
    }

    impl std::fmt::Debug for MockCatalog {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockCatalog").finish()
        }
    }

    fn plans(ids: &[&str]) -> Vec<EntityId> {
        ids.iter().map(|s| EntityId::from(*s)).collect()
    }

    #[tokio::test]
    async fn second_load_hits_cache() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_fetch()
            .times(1)
            .returning(|_| Ok(CatalogSnapshot::new().with_plan(Plan::new("p1", "Basic", 10.0))));
        catalog.expect_fetch_related().never();

        let loader = BaselineLoader::new(Arc::new(catalog), &ComposerConfig::default());
        let a = loader.load(BaselineKey::new(&plans(&["p1"]), &[], &[])).await.unwrap();
        let b = loader.load(BaselineKey::new(&plans(&["p1", "p1"]), &[], &[])).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn offered_bundles_are_folded_in() {
        let mut catalog = MockCatalog::new();
        catalog.expect_fetch().returning(|_| Ok(CatalogSnapshot::new()));
        catalog
            .expect_fetch_related()
            .withf(|bundles, channels| bundles.len() == 1 && channels.is_empty())
            .returning(|_, _| Ok(CatalogSnapshot::new().with_bundle(Bundle::new("b3", "Kids", 4.0))));

        let loader = BaselineLoader::new(Arc::new(catalog), &ComposerConfig::default());
        let snap = loader
            .load(BaselineKey::new(&plans(&["p1"]), &plans(&["b3"]), &[]))
            .await
            .unwrap();
        assert!(snap.bundle(&"b3".into()).is_some());
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let mut catalog = MockCatalog::new();
        let mut calls = 0;
        catalog.expect_fetch().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(CatalogError::Unavailable("down".into()))
            } else {
                Ok(CatalogSnapshot::new())
            }
        });

        let loader = BaselineLoader::new(Arc::new(catalog), &ComposerConfig::default());
        let key = BaselineKey::new(&plans(&["p1"]), &[], &[]);
        assert!(loader.load(key.clone()).await.is_err());
        assert!(loader.load(key).await.is_ok());
    }
}
