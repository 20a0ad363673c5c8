//! Live fan-out of session and hostname changes to connected observers.

pub mod hub;
pub mod types;

pub use hub::{LiveDistributionHub, Observer};
pub use types::FeedEvent;
