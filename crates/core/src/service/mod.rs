//! Remote processing service abstraction.
//!
//! The service owns job execution and job state. This crate only submits
//! jobs and observes state through pushed [`ServiceNotification`]s.

mod error;
mod traits;
mod types;

pub use error::ServiceError;
pub use traits::ProcessingService;
pub use types::{
    JobState, JobStatus, NotificationSink, ServiceNotification, TaskDefinition, TaskOptions,
};
