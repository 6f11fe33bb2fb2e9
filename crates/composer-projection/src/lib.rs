//! Composer Projection
//!
//! Read side of the editing core: what the editor renders and what submit
//! sends. Nothing here mutates drafts.
//!
//! # Core Concepts
//!
//! - [`merge`] / [`project_entity`]: baseline with pending patch applied
//! - [`project_relationship_list`]: baseline rows plus staged adds/removes
//! - [`FieldRules`] / [`EffectiveStateValidator`]: per-field rules gating navigation
//! - [`SubmissionPayload`]: serializable deltas of every job

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod merge;
mod payload;
mod relationships;
mod rules;

pub use merge::{dirty_fields, field_is_dirty, merge, project_entity, Merged};
pub use payload::{JobSubmission, PatchEntry, PatchSet, RelationshipChange, SubmissionPayload};
pub use relationships::{
    project_relationship_list, Membership, RelationshipItem, RelationshipList,
};
pub use rules::{
    job_issues, space_issues, EffectiveStateValidator, FieldIssue, FieldRules, JobLookup,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use composer_catalog::{Bundle, CatalogSnapshot, LinkRow, Plan, Relation};
    use composer_jobs::{Job, JobArgs};

    #[test]
    fn relationship_view_resolves_records_from_baseline() {
        let baseline = CatalogSnapshot::new()
            .with_plan(Plan::new("p1", "Basic", 10.0))
            .with_bundle(Bundle::new("b1", "Sports", 5.0))
            .with_bundle(Bundle::new("b3", "Kids", 4.0))
            .with_link(Relation::PlanBundles, LinkRow::new("p1", "b1", 0));

        let mut job = Job::new(JobArgs::PlanBundles { bundle_ids: vec!["b3".into()] }, vec!["p1".into()]);
        job.edit(|_, relations| {
            relations.toggle_add(Relation::PlanBundles, &"p1".into(), &"b3".into());
        })
        .unwrap();

        let list = project_relationship_list(
            &"p1".into(),
            baseline.links(Relation::PlanBundles),
            job.relations().sets(Relation::PlanBundles),
            |id| baseline.bundle(id).cloned(),
        );
        let names: Vec<&str> = list
            .items
            .iter()
            .filter_map(|i| i.record.as_ref().map(|b| b.name.as_str()))
            .collect();
        assert_eq!(names, vec!["Sports", "Kids"]);
        assert_eq!(list.items[1].membership, Membership::Added);
    }
}
