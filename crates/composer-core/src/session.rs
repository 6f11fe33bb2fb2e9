//! Composer session
//!
//! The session is the store object the editor workspace talks to. It is an
//! explicitly constructed, cheaply cloneable handle; clones share state.
//!
//! All mutations are synchronous and run under a short `parking_lot` lock
//! that is never held across an `.await`. Async work (catalog fetches,
//! navigation validators) happens between two lock sections, and its
//! result is discarded if a newer request overtook it.

use crate::config::ComposerConfig;
use crate::error::{ComposerError, Result};
use crate::intent::{BulkPatch, DiscardOutcome, Intent, IntentOutcome, RelationshipAction};
use crate::loader::{BaselineKey, BaselineLoader};
use composer_catalog::{
    Bundle, CatalogService, CatalogSnapshot, Channel, EntityId, LinkKey, LockOutcome, LockService,
    MasterJobHandle, Plan, Relation, SnapshotTable,
};
use composer_draft::{
    ChannelTarget, DraftSpace, Drafted, FieldEdit, Patch, PatchOutcome, RelationshipDiff, TargetRef,
    ToggleOutcome,
};
use composer_jobs::{
    run_validator, Job, JobArgs, JobId, JobSequencer, JobStatus, JobSummary, NavigationOutcome,
    NavigationRequest, NavigationValidator,
};
use composer_projection::{
    job_issues, merge, project_entity, project_relationship_list, EffectiveStateValidator,
    FieldIssue, JobLookup, Merged, RelationshipList, SubmissionPayload,
};
use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Whether a fetched baseline was installed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineOutcome {
    /// Baseline attached to the job
    Installed,
    /// A newer request for the job was issued first; response dropped
    Stale,
    /// Job removed while the fetch was in flight
    JobGone,
}

#[derive(Debug, Default)]
struct SessionState {
    sequencer: JobSequencer,
    bulk: DraftSpace,
    baseline_requests: HashMap<JobId, u64>,
    next_request: u64,
}

impl SessionState {
    fn job(&self, id: JobId) -> Result<&Job> {
        self.sequencer.job(id).ok_or(ComposerError::UnknownJob(id))
    }

    fn job_mut(&mut self, id: JobId) -> Result<&mut Job> {
        self.sequencer.job_mut(id).ok_or(ComposerError::UnknownJob(id))
    }
}

/// Shared handle to one editing session
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    loader: BaselineLoader,
    locks: Option<Arc<dyn LockService>>,
    config: Arc<ComposerConfig>,
}

impl Session {
    /// Empty session reading baselines from `catalog`
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogService>, config: ComposerConfig) -> Self {
        Self {
            state: Arc::default(),
            loader: BaselineLoader::new(catalog, &config),
            locks: None,
            config: Arc::new(config),
        }
    }

    /// Use an advisory lock service for job plans
    #[inline]
    #[must_use]
    pub fn with_locks(mut self, locks: Arc<dyn LockService>) -> Self {
        self.locks = Some(locks);
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Navigation validator checking the effective state of the job being left
    #[must_use]
    pub fn effective_state_validator(&self) -> EffectiveStateValidator<Self> {
        EffectiveStateValidator::new(self.clone())
    }

    // ---- jobs ------------------------------------------------------------

    /// Create a job without loading its baseline
    ///
    /// # Errors
    /// - `ComposerError::EmptyPlanSelection` if `plan_ids` is empty
    /// - `ComposerError::Sequence` if `id` is already taken
    pub fn create_job(&self, id: Option<JobId>, args: JobArgs, plan_ids: Vec<EntityId>) -> Result<JobId> {
        if plan_ids.is_empty() {
            return Err(ComposerError::EmptyPlanSelection);
        }
        let mut job = Job::new(args, plan_ids);
        if let Some(id) = id {
            job = job.with_id(id);
        }
        self.add_job(job)
    }

    /// Append a prepared job and make it current
    ///
    /// # Errors
    /// Returns `ComposerError::Sequence` if the id is already taken
    pub fn add_job(&self, job: Job) -> Result<JobId> {
        Ok(self.state.lock().sequencer.add_job(job)?)
    }

    /// Create a job and load its baseline
    ///
    /// # Errors
    /// As [`Self::create_job`], plus catalog errors from the fetch
    pub async fn open_job(&self, id: Option<JobId>, args: JobArgs, plan_ids: Vec<EntityId>) -> Result<JobId> {
        let id = self.create_job(id, args, plan_ids)?;
        self.lock_plans(id).await;
        self.load_baseline(id).await?;
        Ok(id)
    }

    /// Remove a job with its drafts and diff, releasing its plan locks
    ///
    /// # Errors
    /// Returns `ComposerError::UnknownJob`
    pub async fn remove_job(&self, id: JobId) -> Result<()> {
        let held = {
            let mut state = self.state.lock();
            let job = state.sequencer.remove_job(id)?;
            state.baseline_requests.remove(&id);
            vec![(id, job.plan_ids().to_vec())]
        };
        self.release_locks(&held).await;
        Ok(())
    }

    /// Fetch and attach the job's baseline
    ///
    /// Only the newest request per job is installed.
    ///
    /// # Errors
    /// - `ComposerError::UnknownJob`
    /// - `ComposerError::Catalog` if the fetch fails
    pub async fn load_baseline(&self, id: JobId) -> Result<BaselineOutcome> {
        let (key, request) = {
            let mut state = self.state.lock();
            let job = state.job(id)?;
            let key = BaselineKey::new(
                job.plan_ids(),
                job.args().offered_bundles(),
                job.args().offered_channels(),
            );
            state.next_request += 1;
            let request = state.next_request;
            state.baseline_requests.insert(id, request);
            (key, request)
        };

        let snapshot = self.loader.load(key).await?;

        let mut state = self.state.lock();
        if state.sequencer.job(id).is_none() {
            tracing::debug!(job = %id, "baseline arrived for a removed job");
            return Ok(BaselineOutcome::JobGone);
        }
        if state.baseline_requests.get(&id) != Some(&request) {
            tracing::warn!(job = %id, request, "stale baseline response dropped");
            return Ok(BaselineOutcome::Stale);
        }
        let job = state.job_mut(id)?;
        job.set_baseline(snapshot);
        tracing::info!(job = %id, "baseline installed");
        Ok(BaselineOutcome::Installed)
    }

    /// Reload baselines of every job concurrently
    ///
    /// # Errors
    /// Returns the first catalog error; other jobs still get their baselines
    pub async fn refresh_baselines(&self) -> Result<Vec<BaselineOutcome>> {
        self.loader.invalidate_all();
        let ids: Vec<JobId> = self.state.lock().sequencer.jobs().iter().map(Job::id).collect();
        join_all(ids.into_iter().map(|id| self.load_baseline(id)))
            .await
            .into_iter()
            .collect()
    }

    async fn lock_plans(&self, id: JobId) {
        let Some(locks) = self.locks.clone() else {
            return;
        };
        let plans = match self.with_job(id, |job| job.plan_ids().to_vec()) {
            Some(plans) => plans,
            None => return,
        };
        match locks.acquire(&id.to_string(), &plans).await {
            Ok(LockOutcome { held_elsewhere, .. }) if !held_elsewhere.is_empty() => {
                for (plan, owner) in &held_elsewhere {
                    tracing::warn!(job = %id, %plan, %owner, "plan locked by another owner");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(job = %id, error = %e, "lock service unavailable"),
        }
    }

    async fn release_locks(&self, held: &[(JobId, Vec<EntityId>)]) {
        let Some(locks) = self.locks.clone() else {
            return;
        };
        for (id, plans) in held {
            if let Err(e) = locks.release(&id.to_string(), plans).await {
                tracing::warn!(job = %id, error = %e, "lock release failed");
            }
        }
    }

    /// Start a master job over the job's plans
    ///
    /// Returns `None` without a lock service.
    ///
    /// # Errors
    /// - `ComposerError::UnknownJob`
    /// - `ComposerError::Catalog` if the lock service refuses
    pub async fn start_master_job(&self, id: JobId) -> Result<Option<MasterJobHandle>> {
        let plans = self
            .with_job(id, |job| job.plan_ids().to_vec())
            .ok_or(ComposerError::UnknownJob(id))?;
        let Some(locks) = self.locks.clone() else {
            return Ok(None);
        };
        let handle = locks.start_master_job(&plans).await?;
        tracing::info!(job = %id, master = %handle.id, "master job started");
        Ok(Some(handle))
    }

    /// Move a job to another status
    ///
    /// Marking ready requires a clean effective state.
    ///
    /// # Errors
    /// - `ComposerError::Invalid` if marking ready with field issues
    /// - `ComposerError::Sequence` for an illegal transition
    pub fn set_status(&self, id: JobId, status: JobStatus) -> Result<()> {
        let mut state = self.state.lock();
        let job = state.job_mut(id)?;
        if status == JobStatus::Ready {
            let issues = job_issues(job);
            if !issues.is_empty() {
                return Err(ComposerError::Invalid { issues });
            }
        }
        job.transition(status)?;
        Ok(())
    }

    // ---- draft store -----------------------------------------------------

    fn edit_job<R>(
        &self,
        id: JobId,
        f: impl FnOnce(&mut DraftSpace, &mut RelationshipDiff) -> R,
    ) -> Result<R> {
        let mut state = self.state.lock();
        Ok(state.job_mut(id)?.edit(f)?)
    }

    /// Toggle one field of one target in a job
    ///
    /// # Errors
    /// - `ComposerError::UnknownJob` / `ComposerError::JobFrozen`
    /// - `ComposerError::Patch` if a value does not fit the field
    pub fn patch_field(&self, id: JobId, edit: FieldEdit) -> Result<PatchOutcome> {
        let entity = edit.entity_type();
        let outcome = self.edit_job(id, |space, _| space.apply(edit))??;
        tracing::debug!(job = %id, %entity, ?outcome, "patch field");
        Ok(outcome)
    }

    /// Typed variant of [`Self::patch_field`]
    ///
    /// # Errors
    /// As [`Self::patch_field`]
    pub fn patch<T: Drafted>(
        &self,
        id: JobId,
        key: T::Key,
        field: T::Field,
        value: composer_catalog::FieldValue,
        original: composer_catalog::FieldValue,
    ) -> Result<PatchOutcome> {
        Ok(self.edit_job(id, |space, _| space.patch_field::<T>(key, field, value, original))??)
    }

    /// Drop one target's patch in a job
    ///
    /// # Errors
    /// `ComposerError::UnknownJob` / `ComposerError::JobFrozen`
    pub fn clear_target(&self, id: JobId, target: &TargetRef) -> Result<bool> {
        self.edit_job(id, |space, _| space.clear_target_ref(target))
    }

    /// Drop every patch and relationship change of a job in one step
    ///
    /// # Errors
    /// `ComposerError::UnknownJob` / `ComposerError::JobFrozen`
    pub fn clear_job(&self, id: JobId) -> Result<()> {
        let mut state = self.state.lock();
        state.job_mut(id)?.discard()?;
        tracing::info!(job = %id, "job drafts cleared");
        Ok(())
    }

    /// Overwrite a patch in the session-level bulk space
    pub fn replace_patch(&self, patch: BulkPatch) {
        let mut state = self.state.lock();
        match patch {
            BulkPatch::Plan { target, patch } => state.bulk.replace_patch::<Plan>(target, patch),
            BulkPatch::Bundle { target, patch } => state.bulk.replace_patch::<Bundle>(target, patch),
            BulkPatch::Channel { target, patch } => state.bulk.replace_patch::<Channel>(target, patch),
        }
    }

    /// Bulk-space patch of one target
    #[must_use]
    pub fn bulk_patch<T: Drafted>(&self, key: &T::Key) -> Option<Patch<T>> {
        self.state.lock().bulk.patch::<T>(key).cloned()
    }

    // ---- relationship tracker -------------------------------------------

    /// Stage a relationship addition, or undo a pending removal
    ///
    /// # Errors
    /// `ComposerError::UnknownJob` / `ComposerError::JobFrozen`
    pub fn toggle_add(&self, id: JobId, relation: Relation, owner: &EntityId, related: &EntityId) -> Result<ToggleOutcome> {
        self.edit_job(id, |_, diff| diff.toggle_add(relation, owner, related))
    }

    /// Stage a relationship removal, or cancel a pending addition
    ///
    /// # Errors
    /// `ComposerError::UnknownJob` / `ComposerError::JobFrozen`
    pub fn toggle_remove(&self, id: JobId, relation: Relation, owner: &EntityId, related: &EntityId) -> Result<ToggleOutcome> {
        self.edit_job(id, |_, diff| diff.toggle_remove(relation, owner, related))
    }

    // ---- navigation ------------------------------------------------------

    /// Validator-gated move to another job
    ///
    /// The lock is released while `validator` runs. A verdict that arrives
    /// after a newer navigation is reported as superseded.
    ///
    /// # Errors
    /// Returns `ComposerError::Sequence` for an out-of-range index
    pub async fn navigate(&self, next: usize, validator: &dyn NavigationValidator) -> Result<NavigationOutcome> {
        let ticket = self.state.lock().sequencer.begin_navigation(next)?;
        let approved = run_validator(validator, ticket.request()).await;
        Ok(self.state.lock().sequencer.complete_navigation(ticket, approved))
    }

    /// Set the current index directly, for callers that already validated
    ///
    /// # Errors
    /// Returns `ComposerError::Sequence` for an out-of-range index
    pub fn set_current_index(&self, index: usize) -> Result<()> {
        Ok(self.state.lock().sequencer.set_current_index(index)?)
    }

    /// Discard a job's drafts, asking `validator` first when configured
    ///
    /// # Errors
    /// `ComposerError::UnknownJob` / `ComposerError::JobFrozen`
    pub async fn discard(&self, id: JobId, validator: &dyn NavigationValidator) -> Result<DiscardOutcome> {
        if self.config.validate_before_discard {
            let request = {
                let state = self.state.lock();
                let index = state.sequencer.position(id).ok_or(ComposerError::UnknownJob(id))?;
                NavigationRequest {
                    from: index,
                    to: index,
                    job: Some(id),
                }
            };
            if !run_validator(validator, request).await {
                tracing::warn!(job = %id, "discard blocked by validator");
                return Ok(DiscardOutcome::Blocked);
            }
        }
        self.clear_job(id)?;
        Ok(DiscardOutcome::Discarded)
    }

    // ---- submit ----------------------------------------------------------

    /// Validate every job, build the payload and reset the session
    ///
    /// Jobs are marked submitted in the payload. Nothing is changed when
    /// validation fails.
    ///
    /// # Errors
    /// Returns `ComposerError::Invalid` listing every field issue
    pub async fn submit(&self) -> Result<SubmissionPayload> {
        let (payload, held) = {
            let mut state = self.state.lock();
            let issues: Vec<FieldIssue> = state.sequencer.jobs().iter().flat_map(job_issues).collect();
            if !issues.is_empty() {
                return Err(ComposerError::Invalid { issues });
            }
            for job in state.sequencer.jobs_mut() {
                if job.status() != JobStatus::Submitted {
                    job.transition(JobStatus::Submitted)?;
                }
            }
            let payload = SubmissionPayload::build(state.sequencer.jobs(), &state.bulk);
            let held = held_plans(&state);
            *state = SessionState::default();
            (payload, held)
        };
        tracing::info!(jobs = payload.jobs.len(), changes = payload.change_count(), "session submitted");
        self.release_locks(&held).await;
        Ok(payload)
    }

    /// Drop every job and the bulk space, releasing all plan locks
    pub async fn reset(&self) {
        let held = {
            let mut state = self.state.lock();
            let held = held_plans(&state);
            *state = SessionState::default();
            held
        };
        self.release_locks(&held).await;
        tracing::info!("session reset");
    }

    // ---- intents ---------------------------------------------------------

    /// Dispatch one intent
    ///
    /// # Errors
    /// Whatever the underlying operation returns
    pub async fn apply(&self, intent: Intent, validator: &dyn NavigationValidator) -> Result<IntentOutcome> {
        tracing::debug!(intent = intent.name(), "apply intent");
        match intent {
            Intent::CreateJob { id, args, plan_ids } => {
                let job = self.open_job(id, args, plan_ids).await?;
                Ok(IntentOutcome::JobCreated { job })
            }
            Intent::PatchField { job, edit } => Ok(IntentOutcome::Patched {
                outcome: self.patch_field(job, edit)?,
            }),
            Intent::ToggleRelationship { job, relation, owner, related, action } => {
                let outcome = match action {
                    RelationshipAction::Add => self.toggle_add(job, relation, &owner, &related)?,
                    RelationshipAction::Remove => self.toggle_remove(job, relation, &owner, &related)?,
                };
                Ok(IntentOutcome::Toggled { outcome })
            }
            Intent::ClearTarget { job, target } => Ok(IntentOutcome::Cleared {
                removed: self.clear_target(job, &target)?,
            }),
            Intent::ReplacePatch { patch } => {
                self.replace_patch(patch);
                Ok(IntentOutcome::Replaced)
            }
            Intent::Discard { job } => Ok(IntentOutcome::Discard {
                outcome: self.discard(job, validator).await?,
            }),
            Intent::Navigate { to } => Ok(IntentOutcome::Navigation {
                outcome: self.navigate(to, validator).await?,
            }),
            Intent::MarkReady { job } => {
                self.set_status(job, JobStatus::Ready)?;
                Ok(IntentOutcome::StatusChanged { status: JobStatus::Ready })
            }
            Intent::RemoveJob { job } => {
                self.remove_job(job).await?;
                Ok(IntentOutcome::JobRemoved { job })
            }
        }
    }

    // ---- views -----------------------------------------------------------

    /// Run `f` against a job
    pub fn with_job<R>(&self, id: JobId, f: impl FnOnce(&Job) -> R) -> Option<R> {
        self.state.lock().sequencer.job(id).map(f)
    }

    /// Job metadata in page order
    #[must_use]
    pub fn jobs(&self) -> Vec<JobSummary> {
        self.state.lock().sequencer.jobs().iter().map(Job::summary).collect()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.state.lock().sequencer.current_index()
    }

    #[must_use]
    pub fn current_job(&self) -> Option<JobId> {
        self.state.lock().sequencer.current_job().map(Job::id)
    }

    /// Whether a job has any pending change
    ///
    /// # Errors
    /// Returns `ComposerError::UnknownJob`
    pub fn is_dirty(&self, id: JobId) -> Result<bool> {
        Ok(self.state.lock().job(id)?.is_dirty())
    }

    /// Whether one field of one target is pending in a job
    ///
    /// # Errors
    /// Returns `ComposerError::UnknownJob`
    pub fn field_is_dirty<T: Drafted>(&self, id: JobId, key: &T::Key, field: T::Field) -> Result<bool> {
        Ok(composer_projection::field_is_dirty::<T>(self.state.lock().job(id)?.space(), key, field))
    }

    /// Field issues of a job's effective state
    ///
    /// # Errors
    /// Returns `ComposerError::UnknownJob`
    pub fn issues(&self, id: JobId) -> Result<Vec<FieldIssue>> {
        Ok(job_issues(self.state.lock().job(id)?))
    }

    /// The job's plans merged with their pending patches
    ///
    /// Empty until the baseline is loaded.
    ///
    /// # Errors
    /// Returns `ComposerError::UnknownJob`
    pub fn merged_plans(&self, id: JobId) -> Result<Vec<Merged<Plan>>> {
        let state = self.state.lock();
        let job = state.job(id)?;
        let Some(baseline) = job.baseline() else {
            return Ok(Vec::new());
        };
        Ok(job
            .plan_ids()
            .iter()
            .filter_map(|pid| baseline.plan(pid).map(|p| merge::<Plan>(job.space(), pid.clone(), p)))
            .collect())
    }

    /// Bundles of one plan: baseline rows plus staged changes, each merged
    /// with its row-scoped patch
    ///
    /// # Errors
    /// Returns `ComposerError::UnknownJob`
    pub fn bundles_for_plan(&self, id: JobId, plan: &EntityId) -> Result<RelationshipList<Merged<Bundle>>> {
        let state = self.state.lock();
        let job = state.job(id)?;
        Ok(linked_view::<Bundle>(job, Relation::PlanBundles, plan, |key| key))
    }

    /// Channels of one plan
    ///
    /// Row views apply the channel-wide patch first, then the row patch.
    ///
    /// # Errors
    /// Returns `ComposerError::UnknownJob`
    pub fn channels_for_plan(&self, id: JobId, plan: &EntityId) -> Result<RelationshipList<Merged<Channel>>> {
        let state = self.state.lock();
        let job = state.job(id)?;
        Ok(linked_view::<Channel>(job, Relation::PlanChannels, plan, ChannelTarget::Link))
    }

    /// Channels carried by one bundle
    ///
    /// # Errors
    /// Returns `ComposerError::UnknownJob`
    pub fn channels_for_bundle(&self, id: JobId, bundle: &EntityId) -> Result<RelationshipList<Merged<Channel>>> {
        let state = self.state.lock();
        let job = state.job(id)?;
        Ok(linked_view::<Channel>(job, Relation::BundleChannels, bundle, ChannelTarget::Link))
    }
}

/// Plans each job may hold locks on
fn held_plans(state: &SessionState) -> Vec<(JobId, Vec<EntityId>)> {
    state
        .sequencer
        .jobs()
        .iter()
        .map(|j| (j.id(), j.plan_ids().to_vec()))
        .collect()
}

/// Relationship list of `owner` with each related record merged under its row key
fn linked_view<T>(
    job: &Job,
    relation: Relation,
    owner: &EntityId,
    row_key: impl Fn(LinkKey) -> T::Key,
) -> RelationshipList<Merged<T>>
where
    T: Drafted + SnapshotTable + RowScoped,
{
    let empty = CatalogSnapshot::new();
    let baseline: &CatalogSnapshot = job.baseline().map_or(&empty, |b| &**b);
    let list = project_relationship_list(
        owner,
        baseline.links(relation),
        job.relations().sets(relation),
        |rid| baseline.get::<T>(rid).cloned(),
    );

    let space = job.space();
    let items = list
        .items
        .into_iter()
        .map(|item| {
            let key = row_key(item.key.clone());
            let record = item.record.map(|base| {
                let base = T::global_layer(space, &item.related_id, base);
                let mut merged = merge::<T>(space, key, &base);
                merged.dirty.extend(T::global_dirty(space, &item.related_id));
                merged
            });
            composer_projection::RelationshipItem {
                related_id: item.related_id,
                key: item.key,
                sort_index: item.sort_index,
                membership: item.membership,
                record,
            }
        })
        .collect();

    RelationshipList {
        items,
        added_ids: list.added_ids,
        removed_ids: list.removed_ids,
    }
}

/// Schemas whose row views may layer a record-wide patch under the row patch
trait RowScoped: Drafted {
    fn global_layer(space: &DraftSpace, id: &EntityId, base: Self) -> Self;
    fn global_dirty(space: &DraftSpace, id: &EntityId) -> BTreeSet<Self::Field>;
}

impl RowScoped for Bundle {
    fn global_layer(_: &DraftSpace, _: &EntityId, base: Self) -> Self {
        base
    }

    fn global_dirty(_: &DraftSpace, _: &EntityId) -> BTreeSet<Self::Field> {
        BTreeSet::new()
    }
}

impl RowScoped for Channel {
    fn global_layer(space: &DraftSpace, id: &EntityId, base: Self) -> Self {
        let target = ChannelTarget::Channel(id.clone());
        project_entity(&base, space.patch::<Channel>(&target))
    }

    fn global_dirty(space: &DraftSpace, id: &EntityId) -> BTreeSet<Self::Field> {
        composer_projection::dirty_fields::<Channel>(space, &ChannelTarget::Channel(id.clone()))
    }
}

impl JobLookup for Session {
    fn with_job<R>(&self, id: JobId, f: impl FnOnce(&Job) -> R) -> Option<R> {
        Session::with_job(self, id, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer_catalog::{InMemoryCatalog, PlanField};
    use composer_jobs::AlwaysAllow;
    use composer_test_utils::{ids, sample_catalog};
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        Session::new(Arc::new(InMemoryCatalog::new(sample_catalog())), ComposerConfig::default())
    }

    #[test]
    fn unknown_job_is_an_error() {
        let s = session();
        let err = s
            .patch::<Plan>(JobId::new(), "p1".into(), PlanField::Name, "X".into(), "Basic".into())
            .unwrap_err();
        assert!(matches!(err, ComposerError::UnknownJob(_)));
    }

    #[test]
    fn empty_plan_selection_rejected() {
        let s = session();
        let err = s
            .create_job(None, JobArgs::PlanBundles { bundle_ids: vec![] }, vec![])
            .unwrap_err();
        assert!(matches!(err, ComposerError::EmptyPlanSelection));
    }

    #[tokio::test]
    async fn merged_plans_follow_patches() {
        let s = session();
        let job = s
            .open_job(None, JobArgs::PlanProperties { property_keys: vec![PlanField::BasePrice] }, ids(&["p1", "p2"]))
            .await
            .unwrap();
        s.patch::<Plan>(job, "p2".into(), PlanField::BasePrice, 35.0.into(), 30.0.into())
            .unwrap();

        let plans = s.merged_plans(job).unwrap();
        assert_eq!(plans.len(), 2);
        assert!(!plans[0].is_dirty());
        assert_eq!(plans[1].record.base_price, 35.0);
        assert!(plans[1].is_field_dirty(PlanField::BasePrice));
    }

    #[tokio::test]
    async fn baseline_reload_keeps_drafts() {
        let s = session();
        let job = s
            .open_job(None, JobArgs::PlanProperties { property_keys: vec![PlanField::Tier] }, ids(&["p1"]))
            .await
            .unwrap();
        s.patch::<Plan>(job, "p1".into(), PlanField::Tier, 2_i64.into(), 0_i64.into())
            .unwrap();
        let outcomes = s.refresh_baselines().await.unwrap();
        assert_eq!(outcomes, vec![BaselineOutcome::Installed]);
        assert!(s.is_dirty(job).unwrap());
    }

    #[tokio::test]
    async fn discard_blocked_by_validator_keeps_drafts() {
        let s = session();
        let job = s
            .open_job(None, JobArgs::PlanProperties { property_keys: vec![PlanField::Name] }, ids(&["p1"]))
            .await
            .unwrap();
        s.patch::<Plan>(job, "p1".into(), PlanField::Name, "Gold".into(), "Basic".into())
            .unwrap();

        let deny = |_: NavigationRequest| async { Ok::<_, anyhow::Error>(false) };
        assert_eq!(s.discard(job, &deny).await.unwrap(), DiscardOutcome::Blocked);
        assert!(s.is_dirty(job).unwrap());

        assert_eq!(s.discard(job, &AlwaysAllow).await.unwrap(), DiscardOutcome::Discarded);
        assert!(!s.is_dirty(job).unwrap());
    }

    #[test]
    fn bulk_space_is_separate_from_jobs() {
        let s = session();
        let patch = Patch::<Plan>::from_entries([(PlanField::Active, false.into())]).unwrap();
        s.replace_patch(BulkPatch::Plan { target: "p1".into(), patch: patch.clone() });
        assert_eq!(s.bulk_patch::<Plan>(&"p1".into()), Some(patch));

        s.replace_patch(BulkPatch::Plan { target: "p1".into(), patch: Patch::new() });
        assert_eq!(s.bulk_patch::<Plan>(&"p1".into()), None);
    }

    #[tokio::test]
    async fn channel_row_view_layers_global_patch() {
        let s = session();
        let job = s
            .open_job(None, JobArgs::PlanChannels { channel_ids: vec![] }, ids(&["p1"]))
            .await
            .unwrap();
        s.patch::<Channel>(
            job,
            ChannelTarget::Channel("c2".into()),
            composer_catalog::ChannelField::Hd,
            true.into(),
            false.into(),
        )
        .unwrap();
        s.patch::<Channel>(
            job,
            ChannelTarget::Link(LinkKey::first("p1", "c2")),
            composer_catalog::ChannelField::Number,
            250_i64.into(),
            201_i64.into(),
        )
        .unwrap();

        let list = s.channels_for_plan(job, &"p1".into()).unwrap();
        let c2 = list.items.iter().find(|i| i.related_id.as_str() == "c2").unwrap();
        let merged = c2.record.as_ref().unwrap();
        assert_eq!(merged.record.number, 250);
        assert!(merged.record.hd);
        assert_eq!(merged.dirty.len(), 2);
    }
}
