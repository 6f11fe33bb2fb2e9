//! Job aggregate
//!
//! A job is one page of batched edits. It owns its pending patches, its
//! relationship diff and the baseline they were made against, so removing
//! the job discards all of them together.

use crate::error::SequenceError;
use crate::status::validate_transition;
use chrono::{DateTime, Utc};
use composer_catalog::{BundleField, CatalogSnapshot, EntityId, PlanField};
use composer_draft::{DraftSpace, RelationshipDiff};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use ulid::Ulid;

/// Job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Ulid);

impl JobId {
    /// Fresh id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Wrap an existing ULID
    #[inline]
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Underlying ULID
    #[inline]
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// Kind of batched edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    /// Edit plan fields
    PlanProperties,
    /// Associate channels with plans
    PlanChannels,
    /// Associate bundles with plans
    PlanBundles,
    /// Edit bundle fields as they appear under plans
    PlanBundleProperties,
}

impl JobType {
    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PlanProperties => "plan-properties",
            Self::PlanChannels => "plan-channels",
            Self::PlanBundles => "plan-bundles",
            Self::PlanBundleProperties => "plan-bundle-properties",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which bundles a bundle-property job targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BundleSelection {
    /// Every bundle linked to the job's plans
    All,
    /// Listed bundles only
    Only(Vec<EntityId>),
}

impl BundleSelection {
    /// Whether `bundle` is targeted
    #[must_use]
    pub fn includes(&self, bundle: &EntityId) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(bundle),
        }
    }
}

/// Type-specific job arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum JobArgs {
    /// Plan fields to edit
    #[serde(rename_all = "camelCase")]
    PlanProperties {
        /// Editable fields
        property_keys: Vec<PlanField>,
    },
    /// Channels offered for association
    #[serde(rename_all = "camelCase")]
    PlanChannels {
        /// Channel ids
        channel_ids: Vec<EntityId>,
    },
    /// Bundles offered for association
    #[serde(rename_all = "camelCase")]
    PlanBundles {
        /// Bundle ids
        bundle_ids: Vec<EntityId>,
    },
    /// Bundle fields to edit per plan row
    #[serde(rename_all = "camelCase")]
    PlanBundleProperties {
        /// Editable fields
        property_keys: Vec<BundleField>,
        /// Targeted bundles
        bundles: BundleSelection,
    },
}

impl JobArgs {
    /// Job type these args belong to
    #[must_use]
    pub fn job_type(&self) -> JobType {
        match self {
            Self::PlanProperties { .. } => JobType::PlanProperties,
            Self::PlanChannels { .. } => JobType::PlanChannels,
            Self::PlanBundles { .. } => JobType::PlanBundles,
            Self::PlanBundleProperties { .. } => JobType::PlanBundleProperties,
        }
    }

    /// Bundles the job offers that may not be linked to its plans yet
    #[must_use]
    pub fn offered_bundles(&self) -> &[EntityId] {
        match self {
            Self::PlanBundles { bundle_ids } => bundle_ids,
            Self::PlanBundleProperties {
                bundles: BundleSelection::Only(ids),
                ..
            } => ids,
            _ => &[],
        }
    }

    /// Channels the job offers that may not be linked to its plans yet
    #[must_use]
    pub fn offered_channels(&self) -> &[EntityId] {
        match self {
            Self::PlanChannels { channel_ids } => channel_ids,
            _ => &[],
        }
    }
}

/// Job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Being edited
    #[default]
    Draft,
    /// Validated, awaiting submit
    Ready,
    /// Sent; frozen
    Submitted,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Submitted => "submitted",
        })
    }
}

/// Serializable job metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    /// Job id
    pub id: JobId,
    /// Job type
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Arguments
    pub args: JobArgs,
    /// Target plans
    pub plan_ids: Vec<EntityId>,
    /// Status
    pub status: JobStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Pending edits present
    pub dirty: bool,
}

/// One edit job with its pending state
#[derive(Debug, Clone)]
pub struct Job {
    id: JobId,
    args: JobArgs,
    plan_ids: Vec<EntityId>,
    status: JobStatus,
    created_at: DateTime<Utc>,
    space: DraftSpace,
    relations: RelationshipDiff,
    baseline: Option<Arc<CatalogSnapshot>>,
}

impl Job {
    /// New draft job over `plan_ids`
    #[must_use]
    pub fn new(args: JobArgs, plan_ids: Vec<EntityId>) -> Self {
        Self {
            id: JobId::new(),
            args,
            plan_ids,
            status: JobStatus::Draft,
            created_at: Utc::now(),
            space: DraftSpace::new(),
            relations: RelationshipDiff::new(),
            baseline: None,
        }
    }

    /// Use a caller-chosen id
    #[inline]
    #[must_use]
    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }

    /// Attach a baseline up front
    #[inline]
    #[must_use]
    pub fn with_baseline(mut self, baseline: Arc<CatalogSnapshot>) -> Self {
        self.baseline = Some(baseline);
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> JobId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn job_type(&self) -> JobType {
        self.args.job_type()
    }

    #[inline]
    #[must_use]
    pub fn args(&self) -> &JobArgs {
        &self.args
    }

    #[inline]
    #[must_use]
    pub fn plan_ids(&self) -> &[EntityId] {
        &self.plan_ids
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> JobStatus {
        self.status
    }

    #[inline]
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Pending field patches
    #[inline]
    #[must_use]
    pub fn space(&self) -> &DraftSpace {
        &self.space
    }

    /// Pending relationship changes
    #[inline]
    #[must_use]
    pub fn relations(&self) -> &RelationshipDiff {
        &self.relations
    }

    /// Baseline the edits are made against, once loaded
    #[inline]
    #[must_use]
    pub fn baseline(&self) -> Option<&Arc<CatalogSnapshot>> {
        self.baseline.as_ref()
    }

    /// Install a freshly loaded baseline
    ///
    /// Pending edits are kept; link-keyed patches stay attached as long as
    /// duplicate rows keep their relative order.
    pub fn set_baseline(&mut self, baseline: Arc<CatalogSnapshot>) {
        self.baseline = Some(baseline);
    }

    /// Any pending patch or relationship change
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.space.is_empty() || !self.relations.is_empty()
    }

    /// Submitted jobs reject edits
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.status == JobStatus::Submitted
    }

    /// Run a mutation against the job's pending state
    ///
    /// A ready job drops back to draft.
    ///
    /// # Errors
    /// Returns `SequenceError::Frozen` for a submitted job
    pub fn edit<R>(
        &mut self,
        f: impl FnOnce(&mut DraftSpace, &mut RelationshipDiff) -> R,
    ) -> Result<R, SequenceError> {
        if self.is_frozen() {
            return Err(SequenceError::Frozen(self.id));
        }
        let out = f(&mut self.space, &mut self.relations);
        if self.status == JobStatus::Ready {
            tracing::debug!(job = %self.id, "edit demoted ready job to draft");
            self.status = JobStatus::Draft;
        }
        Ok(out)
    }

    /// Drop every pending patch and relationship change in one step
    ///
    /// # Errors
    /// Returns `SequenceError::Frozen` for a submitted job
    pub fn discard(&mut self) -> Result<(), SequenceError> {
        self.edit(|space, relations| {
            space.clear();
            relations.clear();
        })
    }

    /// Move to another status
    ///
    /// # Errors
    /// Returns `SequenceError::IllegalTransition` if the move is not allowed
    pub fn transition(&mut self, to: JobStatus) -> Result<(), SequenceError> {
        validate_transition(self.status, to)?;
        tracing::info!(job = %self.id, from = %self.status, %to, "job status changed");
        self.status = to;
        Ok(())
    }

    /// Serializable metadata
    #[must_use]
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            id: self.id,
            job_type: self.job_type(),
            args: self.args.clone(),
            plan_ids: self.plan_ids.clone(),
            status: self.status,
            created_at: self.created_at,
            dirty: self.is_dirty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer_catalog::{Plan, Relation};
    use pretty_assertions::assert_eq;

    fn job() -> Job {
        Job::new(
            JobArgs::PlanProperties {
                property_keys: vec![PlanField::BasePrice],
            },
            vec!["p1".into()],
        )
    }

    #[test]
    fn args_serialize_with_type_tag() {
        let args = JobArgs::PlanBundleProperties {
            property_keys: vec![BundleField::Price],
            bundles: BundleSelection::All,
        };
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "plan-bundle-properties",
                "propertyKeys": ["price"],
                "bundles": "all"
            })
        );
        let back: JobArgs = serde_json::from_value(json).unwrap();
        assert_eq!(back.job_type(), JobType::PlanBundleProperties);
    }

    #[test]
    fn edits_make_job_dirty_and_discard_cleans() {
        let mut job = job();
        assert!(!job.is_dirty());
        job.edit(|space, relations| {
            space
                .patch_field::<Plan>("p1".into(), PlanField::BasePrice, 15.0.into(), 10.0.into())
                .unwrap();
            relations.toggle_add(Relation::PlanBundles, &"p1".into(), &"b3".into());
        })
        .unwrap();
        assert!(job.is_dirty());

        job.discard().unwrap();
        assert!(!job.is_dirty());
        assert!(job.space().is_empty());
        assert!(job.relations().is_empty());
    }

    #[test]
    fn relationship_only_change_is_dirty() {
        let mut job = job();
        job.edit(|_, relations| {
            relations.toggle_remove(Relation::PlanChannels, &"p1".into(), &"c2".into());
        })
        .unwrap();
        assert!(job.is_dirty());
    }

    #[test]
    fn edit_demotes_ready_job() {
        let mut job = job();
        job.transition(JobStatus::Ready).unwrap();
        job.edit(|_, _| ()).unwrap();
        assert_eq!(job.status(), JobStatus::Draft);
    }

    #[test]
    fn submitted_job_is_frozen() {
        let mut job = job();
        job.transition(JobStatus::Submitted).unwrap();
        let err = job.edit(|_, _| ()).unwrap_err();
        assert_eq!(err, SequenceError::Frozen(job.id()));
        assert!(job.discard().is_err());
        assert!(job.transition(JobStatus::Draft).is_err());
    }

    #[test]
    fn job_id_parses_from_display() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
    }
}
