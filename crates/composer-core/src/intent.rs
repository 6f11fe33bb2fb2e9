//! Editor intents
//!
//! The workspace UI speaks to the session in three categories: field
//! patches, relationship toggles, and discard/navigate. Intents are plain
//! data so a script can replay a session.

use composer_catalog::{Bundle, Channel, EntityId, LinkKey, Plan, Relation};
use composer_draft::{ChannelTarget, FieldEdit, Patch, PatchOutcome, TargetRef, ToggleOutcome};
use composer_jobs::{JobArgs, JobId, JobStatus, NavigationOutcome};
use serde::{Deserialize, Serialize};

/// Add or remove a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipAction {
    /// Stage a link, or undo a staged removal
    Add,
    /// Stage an unlink, or cancel a staged addition
    Remove,
}

/// Whole-patch overwrite outside job scoping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", rename_all = "lowercase")]
pub enum BulkPatch {
    /// Plan patch
    Plan {
        /// Plan id
        target: EntityId,
        /// Replacement patch; empty removes the target
        patch: Patch<Plan>,
    },
    /// Bundle patch, scoped to one plan row
    Bundle {
        /// Row key
        target: LinkKey,
        /// Replacement patch; empty removes the target
        patch: Patch<Bundle>,
    },
    /// Channel patch
    Channel {
        /// Channel or row key
        target: ChannelTarget,
        /// Replacement patch; empty removes the target
        patch: Patch<Channel>,
    },
}

/// One user intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "camelCase")]
pub enum Intent {
    /// Create a job and load its baseline
    #[serde(rename_all = "camelCase")]
    CreateJob {
        /// Fixed id, for scripts that refer back to the job
        #[serde(default)]
        id: Option<JobId>,
        args: JobArgs,
        plan_ids: Vec<EntityId>,
    },
    /// Toggle one field
    PatchField { job: JobId, edit: FieldEdit },
    /// Toggle one relationship
    ToggleRelationship {
        job: JobId,
        relation: Relation,
        owner: EntityId,
        related: EntityId,
        action: RelationshipAction,
    },
    /// Drop one target's patch
    ClearTarget { job: JobId, target: TargetRef },
    /// Overwrite a patch in the bulk space
    ReplacePatch { patch: BulkPatch },
    /// Drop every pending change of a job
    Discard { job: JobId },
    /// Validator-gated move to another job
    Navigate { to: usize },
    /// Mark a job ready for submit
    MarkReady { job: JobId },
    /// Remove a job and its drafts
    RemoveJob { job: JobId },
}

impl Intent {
    /// Short name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateJob { .. } => "createJob",
            Self::PatchField { .. } => "patchField",
            Self::ToggleRelationship { .. } => "toggleRelationship",
            Self::ClearTarget { .. } => "clearTarget",
            Self::ReplacePatch { .. } => "replacePatch",
            Self::Discard { .. } => "discard",
            Self::Navigate { .. } => "navigate",
            Self::MarkReady { .. } => "markReady",
            Self::RemoveJob { .. } => "removeJob",
        }
    }
}

/// Whether a gated discard went through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscardOutcome {
    /// Drafts dropped
    Discarded,
    /// Validator refused; drafts kept
    Blocked,
}

/// What an intent did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum IntentOutcome {
    /// Job created with its baseline loaded
    JobCreated {
        /// New job
        job: JobId,
    },
    /// Field toggle applied
    Patched {
        /// Set, reverted or unchanged
        outcome: PatchOutcome,
    },
    /// Relationship toggle applied
    Toggled {
        /// Staged, undone or already staged
        outcome: ToggleOutcome,
    },
    /// Target cleared
    Cleared {
        /// Whether a patch existed
        removed: bool,
    },
    /// Bulk patch overwritten
    Replaced,
    /// Discard attempted
    Discard {
        /// Discarded or blocked
        outcome: DiscardOutcome,
    },
    /// Navigation attempted
    Navigation {
        /// Moved, blocked or superseded
        outcome: NavigationOutcome,
    },
    /// Job status changed
    StatusChanged {
        /// New status
        status: JobStatus,
    },
    /// Job removed and its locks released
    JobRemoved {
        /// Removed job
        job: JobId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use composer_catalog::{FieldValue, PlanField};
    use pretty_assertions::assert_eq;

    #[test]
    fn replace_patch_rejects_ill_kinded_values() {
        let script = serde_json::json!({
            "intent": "replacePatch",
            "patch": { "entityType": "plan", "target": "p1", "patch": { "active": "yes" } }
        });
        assert!(serde_json::from_value::<Intent>(script).is_err());
    }

    #[test]
    fn replace_patch_widens_integer_prices() {
        let script = serde_json::json!({
            "intent": "replacePatch",
            "patch": { "entityType": "plan", "target": "p1", "patch": { "basePrice": 15 } }
        });
        let Intent::ReplacePatch { patch: BulkPatch::Plan { patch, .. } } =
            serde_json::from_value::<Intent>(script).unwrap()
        else {
            panic!("expected a plan replacePatch");
        };
        assert_eq!(patch.get(PlanField::BasePrice), Some(&FieldValue::Number(15.0)));
    }

    #[test]
    fn script_intents_parse() {
        let script = serde_json::json!([
            {
                "intent": "createJob",
                "id": "01J00000000000000000000001",
                "args": { "type": "plan-properties", "propertyKeys": ["basePrice"] },
                "planIds": ["p1"]
            },
            {
                "intent": "patchField",
                "job": "01J00000000000000000000001",
                "edit": { "entityType": "plan", "target": "p1", "field": "basePrice", "value": 15, "original": 10 }
            },
            {
                "intent": "toggleRelationship",
                "job": "01J00000000000000000000001",
                "relation": "plan-bundles",
                "owner": "p1",
                "related": "b3",
                "action": "add"
            },
            { "intent": "navigate", "to": 0 }
        ]);
        let intents: Vec<Intent> = serde_json::from_value(script).unwrap();
        let names: Vec<&str> = intents.iter().map(Intent::name).collect();
        assert_eq!(names, vec!["createJob", "patchField", "toggleRelationship", "navigate"]);

        let Intent::CreateJob { args, .. } = &intents[0] else {
            panic!("expected createJob");
        };
        assert_eq!(args, &JobArgs::PlanProperties { property_keys: vec![PlanField::BasePrice] });
    }
}
