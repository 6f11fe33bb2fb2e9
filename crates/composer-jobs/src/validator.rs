//! Navigation validator seam

use crate::job::JobId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// What a validator is asked to approve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRequest {
    /// Index being left
    pub from: usize,
    /// Index being entered
    pub to: usize,
    /// Job being left, if any
    pub job: Option<JobId>,
}

/// Caller-supplied gate run before leaving a job
///
/// Opaque to the sequencer: `Ok(false)` and `Err(_)` both keep the user on
/// the current job.
#[async_trait]
pub trait NavigationValidator: Send + Sync {
    /// Approve or block the move
    async fn validate(&self, request: NavigationRequest) -> anyhow::Result<bool>;
}

#[async_trait]
impl<F, Fut> NavigationValidator for F
where
    F: Fn(NavigationRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    async fn validate(&self, request: NavigationRequest) -> anyhow::Result<bool> {
        self(request).await
    }
}

/// Validator that approves every move
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAllow;

#[async_trait]
impl NavigationValidator for AlwaysAllow {
    async fn validate(&self, _request: NavigationRequest) -> anyhow::Result<bool> {
        Ok(true)
    }
}
