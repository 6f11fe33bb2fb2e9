//! Concrete catalog schemas

mod bundle;
mod channel;
mod plan;

pub use bundle::{Bundle, BundleField};
pub use channel::{Channel, ChannelField};
pub use plan::{Plan, PlanField};
