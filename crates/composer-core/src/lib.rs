//! Composer Core
//!
//! The editing session behind the bundle composer workspace.
//!
//! # Core Concepts
//!
//! - [`Session`]: shared store handle owning jobs, their drafts and the bulk space
//! - [`Intent`]: field patch, relationship toggle, discard/navigate
//! - [`BaselineLoader`]: cached catalog reads, newest request wins
//! - [`ComposerConfig`]: TOML-loadable settings
//!
//! # Example
//!
//! ```rust,ignore
//! use composer_core::{ComposerConfig, Session};
//! use composer_catalog::{InMemoryCatalog, Plan, PlanField};
//! use composer_jobs::JobArgs;
//!
//! let session = Session::new(Arc::new(catalog), ComposerConfig::default());
//! let job = session
//!     .open_job(None, JobArgs::PlanProperties { property_keys: vec![PlanField::BasePrice] }, vec!["p1".into()])
//!     .await?;
//! session.patch::<Plan>(job, "p1".into(), PlanField::BasePrice, 15.0.into(), 10.0.into())?;
//! let payload = session.submit().await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod intent;
mod loader;
mod session;

pub use config::{ComposerConfig, ConfigError};
pub use error::{ComposerError, Result};
pub use intent::{BulkPatch, DiscardOutcome, Intent, IntentOutcome, RelationshipAction};
pub use loader::{BaselineKey, BaselineLoader};
pub use session::{BaselineOutcome, Session};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a `tracing` subscriber honoring `RUST_LOG`, else `default_filter`
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(default_filter: &str, json: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use composer_catalog::{InMemoryCatalog, Plan, PlanField};
    use composer_jobs::JobArgs;
    use composer_test_utils::{ids, sample_catalog};
    use std::sync::Arc;

    #[tokio::test]
    async fn submit_resets_session() {
        let session = Session::new(Arc::new(InMemoryCatalog::new(sample_catalog())), ComposerConfig::default());
        let job = session
            .open_job(None, JobArgs::PlanProperties { property_keys: vec![PlanField::BasePrice] }, ids(&["p1"]))
            .await
            .unwrap();
        session
            .patch::<Plan>(job, "p1".into(), PlanField::BasePrice, 15.0.into(), 10.0.into())
            .unwrap();

        let payload = session.submit().await.unwrap();
        assert_eq!(payload.jobs.len(), 1);
        assert_eq!(payload.jobs[0].status, composer_jobs::JobStatus::Submitted);
        assert!(session.jobs().is_empty());
    }
}
