//! Job orchestrator implementation.
//!
//! Builds a remote job from task specs and submits it:
//! - Tasks are added in caller order, each with its inputs and one output
//! - The job is registered with the state monitor and subscribed
//! - Only then is it submitted, so no transition can be missed

use std::sync::Arc;

use tracing::{debug, info};

use super::config::OrchestratorConfig;
use super::handle::{JobBackends, JobHandle};
use super::types::{JobError, TaskSpec};
use crate::asset_store::AssetStore;
use crate::monitor::{JobStateObserver, LoggingObserver, StateMonitor};
use crate::service::{NotificationSink, ProcessingService, TaskDefinition};

/// Submits jobs to the processing service.
pub struct JobOrchestrator {
    config: OrchestratorConfig,
    service: Arc<dyn ProcessingService>,
    store: Arc<dyn AssetStore>,
    monitor: Arc<StateMonitor>,
}

impl JobOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        service: Arc<dyn ProcessingService>,
        store: Arc<dyn AssetStore>,
        monitor: Arc<StateMonitor>,
    ) -> Self {
        Self {
            config,
            service,
            store,
            monitor,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<StateMonitor> {
        &self.monitor
    }

    /// Starts building a job.
    pub fn job(&self, name: impl Into<String>) -> JobBuilder<'_> {
        JobBuilder {
            orchestrator: self,
            name: name.into(),
            tasks: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// Submits a job with the default logging observer.
    pub async fn submit_job(
        &self,
        name: &str,
        tasks: Vec<TaskSpec>,
    ) -> Result<JobHandle, JobError> {
        self.job(name).tasks(tasks).submit().await
    }
}

/// Builder for a single job submission.
///
/// `submit` always registers at least one observer before the job is
/// submitted; without explicit observers it registers [`LoggingObserver`].
pub struct JobBuilder<'a> {
    orchestrator: &'a JobOrchestrator,
    name: String,
    tasks: Vec<TaskSpec>,
    observers: Vec<Arc<dyn JobStateObserver>>,
}

impl JobBuilder<'_> {
    pub fn task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn tasks(mut self, tasks: impl IntoIterator<Item = TaskSpec>) -> Self {
        self.tasks.extend(tasks);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn JobStateObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Creates, subscribes and submits the job.
    pub async fn submit(self) -> Result<JobHandle, JobError> {
        let JobBuilder {
            orchestrator,
            name,
            tasks,
            mut observers,
        } = self;

        if tasks.is_empty() {
            return Err(JobError::NoTasks(name));
        }
        if observers.is_empty() {
            observers.push(Arc::new(LoggingObserver));
        }

        let service = &orchestrator.service;
        let job_id = service.create_job(&name).await?;
        info!("Created job {:?} ({}) with {} tasks", name, job_id, tasks.len());

        let mut outputs = Vec::with_capacity(tasks.len());
        for task in &tasks {
            let definition = TaskDefinition {
                name: task.name.clone(),
                processor_id: task.processor.id.clone(),
                configuration: task.configuration.clone(),
                options: task.options,
            };
            let task_id = service.add_task(&job_id, &definition).await?;
            service.bind_inputs(&job_id, &task_id, &task.inputs).await?;
            let output = service
                .add_output(&job_id, &task_id, &task.output_name, task.output_options)
                .await?;
            debug!(
                "Task {:?} ({}) on {} {}: {} inputs -> {}",
                task.name,
                task_id,
                task.processor.name,
                task.processor.version,
                task.inputs.len(),
                output.id
            );
            outputs.push(output);
        }

        let monitor = Arc::clone(&orchestrator.monitor);
        let tracker = monitor.register(&job_id, &name, observers);
        let handle = JobHandle::new(
            job_id.clone(),
            name,
            outputs,
            tracker,
            JobBackends {
                monitor: Arc::clone(&monitor),
                service: Arc::clone(service),
                store: Arc::clone(&orchestrator.store),
            },
            orchestrator.config.reconcile_interval(),
        );

        // On error the handle drops here and unregisters the job.
        let sink: Arc<dyn NotificationSink> = monitor;
        service.subscribe(&job_id, sink).await?;
        service.submit(&job_id).await?;

        info!("Submitted job {}", job_id);
        Ok(handle)
    }
}
