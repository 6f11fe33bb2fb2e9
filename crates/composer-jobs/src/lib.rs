//! Composer Jobs
//!
//! Batched edit jobs and the sequence the user pages through.
//!
//! # Core Concepts
//!
//! - [`Job`]: one page of edits owning its [`composer_draft::DraftSpace`] and
//!   [`composer_draft::RelationshipDiff`]
//! - [`JobStatus`]: `draft → ready → submitted`, with submitted frozen
//! - [`JobSequencer`]: ordered jobs, current index, ticketed navigation
//! - [`NavigationValidator`]: caller-supplied async gate
//!
//! # Example
//!
//! ```rust,ignore
//! use composer_jobs::{Job, JobArgs, JobSequencer, AlwaysAllow};
//!
//! let mut seq = JobSequencer::new();
//! seq.add_job(Job::new(JobArgs::PlanBundles { bundle_ids: vec![] }, vec!["p1".into()]))?;
//! seq.add_job(Job::new(JobArgs::PlanChannels { channel_ids: vec![] }, vec!["p1".into()]))?;
//! let outcome = seq.navigate(0, &AlwaysAllow).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod job;
mod sequencer;
mod status;
mod validator;

pub use error::SequenceError;
pub use job::{BundleSelection, Job, JobArgs, JobId, JobStatus, JobSummary, JobType};
pub use sequencer::{run_validator, JobSequencer, NavigationOutcome, NavigationTicket};
pub use status::{allowed_transitions, validate_transition};
pub use validator::{AlwaysAllow, NavigationRequest, NavigationValidator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
