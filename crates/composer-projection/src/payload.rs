//! Submission payload
//!
//! Serializes every job's pending deltas. Patch maps are emitted as entry
//! lists because row and channel keys are not strings.

use chrono::{DateTime, Utc};
use composer_catalog::{Bundle, Channel, Entity, EntityId, LinkKey, Plan, Relation};
use composer_draft::{ChannelTarget, DraftSpace, Drafted, Patch};
use composer_jobs::{Job, JobArgs, JobId, JobStatus, JobType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Patch of one target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(serialize = "K: Serialize", deserialize = "K: DeserializeOwned")
)]
pub struct PatchEntry<K, T: Entity> {
    /// Target key
    pub target: K,
    /// Changed fields
    pub fields: Patch<T>,
}

/// All field patches of one job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchSet {
    /// Plan patches by plan id
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plans: Vec<PatchEntry<EntityId, Plan>>,
    /// Bundle patches by plan row
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bundles: Vec<PatchEntry<LinkKey, Bundle>>,
    /// Channel patches by channel or row
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<PatchEntry<ChannelTarget, Channel>>,
}

fn entries<T: Drafted>(space: &DraftSpace) -> Vec<PatchEntry<T::Key, T>> {
    space
        .patches::<T>()
        .iter()
        .map(|(key, patch)| PatchEntry {
            target: key.clone(),
            fields: patch.clone(),
        })
        .collect()
}

impl PatchSet {
    /// Snapshot of a draft space
    #[must_use]
    pub fn from_space(space: &DraftSpace) -> Self {
        Self {
            plans: entries::<Plan>(space),
            bundles: entries::<Bundle>(space),
            channels: entries::<Channel>(space),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty() && self.bundles.is_empty() && self.channels.is_empty()
    }
}

/// Pending membership changes of one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipChange {
    /// Relation
    pub relation: Relation,
    /// Owning entity
    pub owner: EntityId,
    /// Ids to link, staging order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to_add: Vec<EntityId>,
    /// Ids to unlink, staging order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to_remove: Vec<EntityId>,
}

/// Everything one job submits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    /// Job id
    pub id: JobId,
    /// Job type
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Arguments the job was created with
    pub args: JobArgs,
    /// Target plans
    pub plan_ids: Vec<EntityId>,
    /// Status at submit
    pub status: JobStatus,
    /// Field patches
    pub patches: PatchSet,
    /// Relationship changes, by relation then owner
    pub relationships: Vec<RelationshipChange>,
}

impl JobSubmission {
    /// Snapshot of one job's deltas
    #[must_use]
    pub fn from_job(job: &Job) -> Self {
        let mut relationships = Vec::new();
        for (relation, sets) in job.relations().iter() {
            let owners = sets.to_add().keys().chain(sets.to_remove().keys());
            let mut seen: Vec<&EntityId> = owners.collect();
            seen.sort();
            seen.dedup();
            for owner in seen {
                relationships.push(RelationshipChange {
                    relation,
                    owner: owner.clone(),
                    to_add: sets.added(owner).map(|s| s.iter().cloned().collect()).unwrap_or_default(),
                    to_remove: sets.removed(owner).map(|s| s.iter().cloned().collect()).unwrap_or_default(),
                });
            }
        }
        Self {
            id: job.id(),
            job_type: job.job_type(),
            args: job.args().clone(),
            plan_ids: job.plan_ids().to_vec(),
            status: job.status(),
            patches: PatchSet::from_space(job.space()),
            relationships,
        }
    }

    /// Nothing to apply
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty() && self.relationships.is_empty()
    }
}

/// Payload handed to the submission sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    /// When the payload was built
    pub submitted_at: DateTime<Utc>,
    /// Jobs in page order
    pub jobs: Vec<JobSubmission>,
    /// Plan-independent bulk patches, if any
    #[serde(default, skip_serializing_if = "PatchSet::is_empty")]
    pub bulk: PatchSet,
}

impl SubmissionPayload {
    /// Payload for `jobs` plus the bulk space
    #[must_use]
    pub fn build<'a>(jobs: impl IntoIterator<Item = &'a Job>, bulk: &DraftSpace) -> Self {
        Self {
            submitted_at: Utc::now(),
            jobs: jobs.into_iter().map(JobSubmission::from_job).collect(),
            bulk: PatchSet::from_space(bulk),
        }
    }

    /// Total targets and owners carrying changes
    #[must_use]
    pub fn change_count(&self) -> usize {
        let count = |p: &PatchSet| p.plans.len() + p.bundles.len() + p.channels.len();
        self.jobs
            .iter()
            .map(|j| count(&j.patches) + j.relationships.len())
            .sum::<usize>()
            + count(&self.bulk)
    }

    /// Pretty JSON
    ///
    /// # Errors
    /// Returns the serializer error, which cannot happen for these types in practice
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
