//! Job orchestrator for remote processing jobs.
//!
//! The orchestrator turns a list of [`TaskSpec`]s into one remote job:
//! - **Build**: tasks are appended in caller order, each bound to its inputs
//!   and given one output asset
//! - **Observe**: the job is registered with the [`StateMonitor`] and
//!   subscribed before it is submitted
//! - **Wait**: [`JobHandle::await_completion`] resolves on a terminal state,
//!   a deadline, or a cancellation token
//!
//! [`StateMonitor`]: crate::monitor::StateMonitor

mod config;
mod handle;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use handle::JobHandle;
pub use runner::{JobBuilder, JobOrchestrator};
pub use types::{JobError, JobFailure, TaskSpec};
