//! Trait definition for the remote processing service.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::ServiceError;
use super::types::{JobStatus, NotificationSink, TaskDefinition};
use crate::asset_store::{Asset, AssetCreationOptions};
use crate::catalog::Processor;

/// The remote service that accepts and executes processing jobs.
#[async_trait]
pub trait ProcessingService: Send + Sync {
    /// Returns the name of this service implementation.
    fn name(&self) -> &str;

    /// Lists every processor the service offers.
    async fn list_processors(&self) -> Result<Vec<Processor>, ServiceError>;

    /// Creates an empty, unsubmitted job. Returns the job id.
    async fn create_job(&self, name: &str) -> Result<String, ServiceError>;

    /// Appends a task to the job. Returns the task id.
    async fn add_task(&self, job_id: &str, task: &TaskDefinition) -> Result<String, ServiceError>;

    /// Binds input assets to a task.
    async fn bind_inputs(
        &self,
        job_id: &str,
        task_id: &str,
        inputs: &[Asset],
    ) -> Result<(), ServiceError>;

    /// Declares the task's output; the service creates the output asset.
    async fn add_output(
        &self,
        job_id: &str,
        task_id: &str,
        name: &str,
        options: AssetCreationOptions,
    ) -> Result<Asset, ServiceError>;

    /// Registers a sink for the job's state-change notifications.
    async fn subscribe(
        &self,
        job_id: &str,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<(), ServiceError>;

    /// Enqueues the job. Does not wait for it to run.
    async fn submit(&self, job_id: &str) -> Result<(), ServiceError>;

    /// Reads the job's current state.
    async fn current_state(&self, job_id: &str) -> Result<JobStatus, ServiceError>;
}
