//! Output publisher - exposes finished output assets for streaming.
//!
//! Publishing creates a long-lived read policy and an origin locator whose
//! start time is backdated to tolerate clock skew between this host and the
//! store. Those grants are the product of publication and are never revoked
//! here.

mod config;
mod publisher;
mod types;

pub use config::{PublisherConfig, MAX_CLOCK_SKEW_MINUTES, MAX_POLICY_DURATION_DAYS};
pub use publisher::OutputPublisher;
pub use types::{PublishOutcome, PublishedOutput};
