//! Types for the job orchestrator.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::asset_store::{Asset, AssetCreationOptions, AssetStoreError};
use crate::catalog::Processor;
use crate::service::{JobState, ServiceError, TaskOptions};

/// One unit of work to submit as part of a job.
#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: String,
    pub processor: Processor,
    /// Processor-specific configuration (preset name, XML, JSON...).
    pub configuration: String,
    pub options: TaskOptions,
    pub inputs: Vec<Asset>,
    /// Name of the output asset the task creates.
    pub output_name: String,
    pub output_options: AssetCreationOptions,
}

impl TaskSpec {
    pub fn new(
        name: impl Into<String>,
        processor: Processor,
        configuration: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            output_name: format!("{} output", name),
            name,
            processor,
            configuration: configuration.into(),
            options: TaskOptions::None,
            inputs: Vec::new(),
            output_options: AssetCreationOptions::None,
        }
    }

    pub fn with_input(mut self, asset: Asset) -> Self {
        self.inputs.push(asset);
        self
    }

    pub fn with_inputs(mut self, assets: impl IntoIterator<Item = Asset>) -> Self {
        self.inputs.extend(assets);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, options: AssetCreationOptions) -> Self {
        self.output_name = name.into();
        self.output_options = options;
        self
    }

    pub fn with_options(mut self, options: TaskOptions) -> Self {
        self.options = options;
        self
    }
}

/// A job that reached `Error` or `Canceled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub job_id: String,
    pub job_name: String,
    pub state: JobState,
    /// Last diagnostic message reported by the service.
    pub message: Option<String>,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {:?} ended in state {}", self.job_name, self.state)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// Errors that can occur while submitting or awaiting a job.
#[derive(Debug, Error)]
pub enum JobError {
    /// A job needs at least one task.
    #[error("job {0:?} has no tasks")]
    NoTasks(String),

    /// The processing service call failed.
    #[error("processing service error: {0}")]
    Service(#[from] ServiceError),

    /// Reading output assets failed.
    #[error("asset store error: {0}")]
    Store(#[from] AssetStoreError),

    /// The job ended in a failure state.
    #[error("{0}")]
    Failed(JobFailure),

    /// The wait deadline elapsed; the job may still be running.
    #[error("job {job_id} did not reach a terminal state within {timeout:?}")]
    Timeout { job_id: String, timeout: Duration },

    /// The caller abandoned the wait; the job may still be running.
    #[error("wait for job {job_id} was cancelled")]
    Cancelled { job_id: String },

    /// The monitor stopped delivering updates for the job.
    #[error("state monitor closed for job {0}")]
    MonitorClosed(String),
}

impl JobError {
    /// True when the job was left running remotely and can be awaited again.
    pub fn is_still_running(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Cancelled { .. })
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}
