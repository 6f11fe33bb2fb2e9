//! Effective-state validation
//!
//! Rules are per field, so a job's effective state is valid iff every
//! pending value passes; untouched fields keep their baseline values.

use composer_catalog::{
    Bundle, BundleField, Channel, ChannelField, EntityField, EntityType, FieldValue, Plan, PlanField,
};
use composer_draft::{DraftSpace, Drafted};
use composer_jobs::{Job, JobId, NavigationRequest, NavigationValidator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A field value the editor should flag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIssue {
    /// Schema of the target
    pub entity_type: EntityType,
    /// Target key, display form
    pub target: String,
    /// Field wire name
    pub field: String,
    /// What is wrong
    pub message: String,
}

/// Schema with per-field rules
pub trait FieldRules: Drafted {
    /// Reason `value` is not acceptable for `field`
    fn check(field: Self::Field, value: &FieldValue) -> Option<&'static str>;
}

fn non_empty(value: &FieldValue) -> Option<&'static str> {
    match value.as_text() {
        Some(text) if text.trim().is_empty() => Some("must not be empty"),
        _ => None,
    }
}

fn price(value: &FieldValue) -> Option<&'static str> {
    match value.as_number() {
        Some(n) if !n.is_finite() => Some("must be a finite number"),
        Some(n) if n < 0.0 => Some("must not be negative"),
        _ => None,
    }
}

impl FieldRules for Plan {
    fn check(field: PlanField, value: &FieldValue) -> Option<&'static str> {
        match field {
            PlanField::Name => non_empty(value),
            PlanField::BasePrice => price(value),
            PlanField::Tier => match value {
                FieldValue::Integer(t) if *t < 0 => Some("must not be negative"),
                _ => None,
            },
            PlanField::BillingPeriod => non_empty(value),
            PlanField::Description | PlanField::Active => None,
        }
    }
}

impl FieldRules for Bundle {
    fn check(field: BundleField, value: &FieldValue) -> Option<&'static str> {
        match field {
            BundleField::Name => non_empty(value),
            BundleField::Price => price(value),
            BundleField::Description | BundleField::Active => None,
        }
    }
}

impl FieldRules for Channel {
    fn check(field: ChannelField, value: &FieldValue) -> Option<&'static str> {
        match field {
            ChannelField::Name => non_empty(value),
            ChannelField::Number => match value {
                FieldValue::Integer(n) if *n <= 0 => Some("must be positive"),
                _ => None,
            },
            ChannelField::Genre | ChannelField::Hd => None,
        }
    }
}

fn collect<T: FieldRules>(space: &DraftSpace, issues: &mut Vec<FieldIssue>) {
    for (key, patch) in space.patches::<T>() {
        for (field, value) in patch.iter() {
            if let Some(message) = T::check(field, value) {
                issues.push(FieldIssue {
                    entity_type: T::ENTITY_TYPE,
                    target: key.to_string(),
                    field: field.name().to_string(),
                    message: message.to_string(),
                });
            }
        }
    }
}

/// Rule violations among a space's pending values
#[must_use]
pub fn space_issues(space: &DraftSpace) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    collect::<Plan>(space, &mut issues);
    collect::<Bundle>(space, &mut issues);
    collect::<Channel>(space, &mut issues);
    issues
}

/// Rule violations in a job's effective state
#[must_use]
pub fn job_issues(job: &Job) -> Vec<FieldIssue> {
    space_issues(job.space())
}

/// Read access to live jobs
pub trait JobLookup: Send + Sync {
    /// Run `f` against the job, if it exists
    fn with_job<R>(&self, id: JobId, f: impl FnOnce(&Job) -> R) -> Option<R>;
}

/// Blocks navigation away from a job whose effective state breaks a rule
#[derive(Debug, Clone)]
pub struct EffectiveStateValidator<L> {
    lookup: L,
}

impl<L: JobLookup> EffectiveStateValidator<L> {
    /// Validator reading jobs through `lookup`
    #[inline]
    #[must_use]
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl<L: JobLookup> NavigationValidator for EffectiveStateValidator<L> {
    async fn validate(&self, request: NavigationRequest) -> anyhow::Result<bool> {
        let Some(id) = request.job else {
            return Ok(true);
        };
        let issues = self.lookup.with_job(id, job_issues).unwrap_or_default();
        if let Some(first) = issues.first() {
            tracing::warn!(
                job = %id,
                count = issues.len(),
                target = %first.target,
                field = %first.field,
                "effective state invalid"
            );
        }
        Ok(issues.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer_catalog::{EntityId, LinkKey};
    use composer_draft::ChannelTarget;
    use composer_jobs::JobArgs;
    use pretty_assertions::assert_eq;

    #[test]
    fn valid_edits_raise_nothing() {
        let mut space = DraftSpace::new();
        space
            .patch_field::<Plan>("p1".into(), PlanField::BasePrice, 0.0.into(), 10.0.into())
            .unwrap();
        space
            .patch_field::<Channel>(
                ChannelTarget::Channel("c1".into()),
                ChannelField::Number,
                3_i64.into(),
                1_i64.into(),
            )
            .unwrap();
        assert!(space_issues(&space).is_empty());
    }

    #[test]
    fn each_rule_fires() {
        let mut space = DraftSpace::new();
        let p1 = EntityId::from("p1");
        space
            .patch_field::<Plan>(p1.clone(), PlanField::Name, "  ".into(), "Basic".into())
            .unwrap();
        space
            .patch_field::<Plan>(p1.clone(), PlanField::BasePrice, (-1.0).into(), 10.0.into())
            .unwrap();
        space
            .patch_field::<Plan>(p1, PlanField::Tier, (-2_i64).into(), 0_i64.into())
            .unwrap();
        space
            .patch_field::<Bundle>(LinkKey::first("p1", "b1"), BundleField::Price, f64::NAN.into(), 5.0.into())
            .unwrap();
        space
            .patch_field::<Channel>(
                ChannelTarget::Channel("c1".into()),
                ChannelField::Number,
                0_i64.into(),
                1_i64.into(),
            )
            .unwrap();

        let fields: Vec<(EntityType, String)> = space_issues(&space)
            .into_iter()
            .map(|i| (i.entity_type, i.field))
            .collect();
        assert_eq!(
            fields,
            vec![
                (EntityType::Plan, "name".to_string()),
                (EntityType::Plan, "basePrice".to_string()),
                (EntityType::Plan, "tier".to_string()),
                (EntityType::Bundle, "price".to_string()),
                (EntityType::Channel, "number".to_string()),
            ]
        );
    }

    struct One(Job);

    impl JobLookup for One {
        fn with_job<R>(&self, id: JobId, f: impl FnOnce(&Job) -> R) -> Option<R> {
            (self.0.id() == id).then(|| f(&self.0))
        }
    }

    #[tokio::test]
    async fn validator_blocks_invalid_job() {
        let mut job = Job::new(JobArgs::PlanProperties { property_keys: vec![PlanField::Name] }, vec!["p1".into()]);
        job.edit(|space, _| {
            space
                .patch_field::<Plan>("p1".into(), PlanField::Name, "".into(), "Basic".into())
                .unwrap();
        })
        .unwrap();
        let id = job.id();
        let validator = EffectiveStateValidator::new(One(job));

        let request = NavigationRequest { from: 0, to: 1, job: Some(id) };
        assert!(!validator.validate(request).await.unwrap());

        let unknown = NavigationRequest { from: 0, to: 1, job: Some(JobId::new()) };
        assert!(validator.validate(unknown).await.unwrap());
    }
}
