//! Mock processing service for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use super::MockAssetStore;
use crate::asset_store::{Asset, AssetCreationOptions};
use crate::catalog::Processor;
use crate::service::{
    JobState, JobStatus, NotificationSink, ProcessingService, ServiceError, ServiceNotification,
    TaskDefinition,
};

/// A task recorded on a mock job.
#[derive(Debug, Clone)]
pub struct RecordedTask {
    pub id: String,
    pub definition: TaskDefinition,
    pub inputs: Vec<Asset>,
    pub output: Option<Asset>,
}

/// A job recorded by the mock service.
#[derive(Debug, Clone)]
pub struct RecordedJob {
    pub id: String,
    pub name: String,
    pub tasks: Vec<RecordedTask>,
    pub submitted: bool,
    pub status: Option<JobStatus>,
}

struct MockJob {
    record: RecordedJob,
    sinks: Vec<Arc<dyn NotificationSink>>,
}

/// Shared state that outlives a single call (playback tasks hold it).
struct Shared {
    jobs: RwLock<Vec<MockJob>>,
    notifications_enabled: RwLock<bool>,
    store: Option<Arc<MockAssetStore>>,
    output_files: RwLock<Vec<(String, Vec<u8>)>>,
}

impl Shared {
    /// Updates the job's state and pushes it to every sink.
    async fn push(&self, job_id: &str, status: JobStatus) {
        let sinks = {
            let mut jobs = self.jobs.write().await;
            let Some(job) = jobs.iter_mut().find(|j| j.record.id == job_id) else {
                return;
            };
            job.record.status = Some(status.clone());
            job.sinks.clone()
        };

        if !*self.notifications_enabled.read().await {
            return;
        }
        for sink in sinks {
            sink.notify(ServiceNotification::new(job_id, status.clone()));
        }
    }

    /// Writes the configured output files into every task output.
    async fn materialize_outputs(&self, job_id: &str) {
        let Some(store) = &self.store else {
            return;
        };
        let outputs: Vec<Asset> = {
            let jobs = self.jobs.read().await;
            jobs.iter()
                .find(|j| j.record.id == job_id)
                .map(|j| j.record.tasks.iter().filter_map(|t| t.output.clone()).collect())
                .unwrap_or_default()
        };
        let files = self.output_files.read().await.clone();
        for asset in outputs {
            for (name, contents) in &files {
                let _ = store.insert_file(&asset.id, name, contents).await;
            }
        }
    }
}

/// Mock implementation of the ProcessingService trait.
///
/// Submitted jobs move to `Queued` immediately, then play back a scripted
/// sequence of states on a background task:
/// - Each step waits `step_delay` before being applied
/// - Subscribed sinks are notified unless notifications are disabled
/// - On `Finished`, configured output files are written into the output
///   assets (when backed by a [`MockAssetStore`])
///
/// Without a script, jobs stay `Queued` until [`push_state`](Self::push_state).
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(MockAssetStore::new());
/// let service = MockProcessingService::with_asset_store(store.clone());
/// service.set_transitions(vec![JobState::Scheduled, JobState::Processing, JobState::Finished]).await;
/// service.set_output_files(vec![("out.ism".into(), b"<smil/>".to_vec())]).await;
/// ```
pub struct MockProcessingService {
    shared: Arc<Shared>,
    processors: Arc<RwLock<Vec<Processor>>>,
    script: Arc<RwLock<Vec<JobStatus>>>,
    step_delay: Arc<RwLock<Duration>>,
    calls: Arc<RwLock<Vec<String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<ServiceError>>>,
}

impl Default for MockProcessingService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessingService {
    /// Create a mock service whose output assets are not backed by a store.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a mock service that creates output assets in `store`.
    pub fn with_asset_store(store: Arc<MockAssetStore>) -> Self {
        Self::build(Some(store))
    }

    fn build(store: Option<Arc<MockAssetStore>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                jobs: RwLock::new(Vec::new()),
                notifications_enabled: RwLock::new(true),
                store,
                output_files: RwLock::new(Vec::new()),
            }),
            processors: Arc::new(RwLock::new(Vec::new())),
            script: Arc::new(RwLock::new(Vec::new())),
            step_delay: Arc::new(RwLock::new(Duration::from_millis(5))),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn set_processors(&self, processors: Vec<Processor>) {
        *self.processors.write().await = processors;
    }

    /// Set an error to be returned on the next operation.
    pub async fn set_next_error(&self, error: ServiceError) {
        *self.next_error.write().await = Some(error);
    }

    /// States played back after submission (following `Queued`).
    pub async fn set_transitions(&self, states: Vec<JobState>) {
        self.set_script(states.into_iter().map(JobStatus::new).collect())
            .await;
    }

    /// Statuses played back after submission, with messages.
    pub async fn set_script(&self, script: Vec<JobStatus>) {
        *self.script.write().await = script;
    }

    pub async fn set_step_delay(&self, delay: Duration) {
        *self.step_delay.write().await = delay;
    }

    /// Files written into every output asset when a job finishes.
    pub async fn set_output_files(&self, files: Vec<(String, Vec<u8>)>) {
        *self.shared.output_files.write().await = files;
    }

    /// When disabled, state still changes but no sink is notified.
    pub async fn set_notifications_enabled(&self, enabled: bool) {
        *self.shared.notifications_enabled.write().await = enabled;
    }

    /// Forces a job into `status` and notifies its sinks.
    pub async fn push_state(&self, job_id: &str, status: JobStatus) {
        self.shared.push(job_id, status).await;
    }

    /// Trait methods called so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    /// Jobs created so far, in creation order.
    pub async fn recorded_jobs(&self) -> Vec<RecordedJob> {
        self.shared
            .jobs
            .read()
            .await
            .iter()
            .map(|j| j.record.clone())
            .collect()
    }

    pub async fn subscriber_count(&self, job_id: &str) -> usize {
        self.shared
            .jobs
            .read()
            .await
            .iter()
            .find(|j| j.record.id == job_id)
            .map_or(0, |j| j.sinks.len())
    }

    async fn record(&self, call: &str) -> Result<(), ServiceError> {
        self.calls.write().await.push(call.to_string());
        match self.next_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn with_job<T>(
        &self,
        job_id: &str,
        f: impl FnOnce(&mut MockJob) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut jobs = self.shared.jobs.write().await;
        let job = jobs
            .iter_mut()
            .find(|j| j.record.id == job_id)
            .ok_or_else(|| ServiceError::JobNotFound(job_id.to_string()))?;
        f(job)
    }
}

#[async_trait]
impl ProcessingService for MockProcessingService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_processors(&self) -> Result<Vec<Processor>, ServiceError> {
        self.record("list_processors").await?;
        Ok(self.processors.read().await.clone())
    }

    async fn create_job(&self, name: &str) -> Result<String, ServiceError> {
        self.record("create_job").await?;
        let id = format!("nb:jid:UUID:{}", uuid::Uuid::new_v4());
        self.shared.jobs.write().await.push(MockJob {
            record: RecordedJob {
                id: id.clone(),
                name: name.to_string(),
                tasks: Vec::new(),
                submitted: false,
                status: None,
            },
            sinks: Vec::new(),
        });
        Ok(id)
    }

    async fn add_task(&self, job_id: &str, task: &TaskDefinition) -> Result<String, ServiceError> {
        self.record("add_task").await?;
        self.with_job(job_id, |job| {
            let id = format!("{}-task-{}", job.record.id, job.record.tasks.len());
            job.record.tasks.push(RecordedTask {
                id: id.clone(),
                definition: task.clone(),
                inputs: Vec::new(),
                output: None,
            });
            Ok(id)
        })
        .await
    }

    async fn bind_inputs(
        &self,
        job_id: &str,
        task_id: &str,
        inputs: &[Asset],
    ) -> Result<(), ServiceError> {
        self.record("bind_inputs").await?;
        self.with_job(job_id, |job| {
            let task = job
                .record
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;
            task.inputs.extend_from_slice(inputs);
            Ok(())
        })
        .await
    }

    async fn add_output(
        &self,
        job_id: &str,
        task_id: &str,
        name: &str,
        options: AssetCreationOptions,
    ) -> Result<Asset, ServiceError> {
        self.record("add_output").await?;
        let asset = match &self.shared.store {
            Some(store) => store.insert_asset(name, options).await,
            None => Asset {
                id: format!("nb:cid:UUID:{}", uuid::Uuid::new_v4()),
                name: name.to_string(),
                options,
                files: Vec::new(),
                created_at: chrono::Utc::now(),
            },
        };
        self.with_job(job_id, |job| {
            let task = job
                .record
                .tasks
                .iter_mut()
                .find(|t| t.id == task_id)
                .ok_or_else(|| ServiceError::TaskNotFound(task_id.to_string()))?;
            task.output = Some(asset.clone());
            Ok(())
        })
        .await?;
        Ok(asset)
    }

    async fn subscribe(
        &self,
        job_id: &str,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<(), ServiceError> {
        self.record("subscribe").await?;
        self.with_job(job_id, |job| {
            job.sinks.push(sink);
            Ok(())
        })
        .await
    }

    async fn submit(&self, job_id: &str) -> Result<(), ServiceError> {
        self.record("submit").await?;
        self.with_job(job_id, |job| {
            if job.record.submitted {
                return Err(ServiceError::api(409, "job already submitted"));
            }
            job.record.submitted = true;
            Ok(())
        })
        .await?;

        self.shared
            .push(job_id, JobStatus::new(JobState::Queued))
            .await;

        let script = self.script.read().await.clone();
        let delay = *self.step_delay.read().await;
        let shared = Arc::clone(&self.shared);
        let job_id = job_id.to_string();
        tokio::spawn(async move {
            for status in script {
                tokio::time::sleep(delay).await;
                if status.state == JobState::Finished {
                    shared.materialize_outputs(&job_id).await;
                }
                shared.push(&job_id, status).await;
            }
        });
        Ok(())
    }

    async fn current_state(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        self.record("current_state").await?;
        self.with_job(job_id, |job| {
            Ok(job
                .record
                .status
                .clone()
                .unwrap_or_else(|| JobStatus::new(JobState::Queued)))
        })
        .await
    }
}
