//! Handle to a submitted job.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{JobError, JobFailure};
use crate::asset_store::{Asset, AssetStore};
use crate::monitor::{JobTracker, JobTransition, StateMonitor};
use crate::service::{
    JobState, JobStatus, NotificationSink, ProcessingService, ServiceNotification,
};

/// Services a handle talks to after submission.
#[derive(Clone)]
pub(super) struct JobBackends {
    pub(super) monitor: Arc<StateMonitor>,
    pub(super) service: Arc<dyn ProcessingService>,
    pub(super) store: Arc<dyn AssetStore>,
}

/// A submitted job.
///
/// Dropping the handle stops local monitoring; the remote job is unaffected.
pub struct JobHandle {
    job_id: String,
    name: String,
    /// Output assets in task order, as created at submission time.
    outputs: Vec<Asset>,
    tracker: Arc<JobTracker>,
    backends: JobBackends,
    reconcile_interval: Option<Duration>,
}

impl fmt::Debug for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobHandle")
            .field("job_id", &self.job_id)
            .field("name", &self.name)
            .field("outputs", &self.outputs)
            .field("state", &self.current_state())
            .finish_non_exhaustive()
    }
}

impl JobHandle {
    pub(super) fn new(
        job_id: String,
        name: String,
        outputs: Vec<Asset>,
        tracker: Arc<JobTracker>,
        backends: JobBackends,
        reconcile_interval: Option<Duration>,
    ) -> Self {
        Self {
            job_id,
            name,
            outputs,
            tracker,
            backends,
            reconcile_interval,
        }
    }

    pub fn id(&self) -> &str {
        &self.job_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Output assets as declared at submission (files not yet populated).
    pub fn declared_outputs(&self) -> &[Asset] {
        &self.outputs
    }

    /// Latest observed state, if any notification arrived yet.
    pub fn current_state(&self) -> Option<JobState> {
        self.tracker.latest().map(|s| s.state)
    }

    /// All transitions observed so far, oldest first.
    pub fn transitions(&self) -> Vec<JobTransition> {
        self.tracker.transitions()
    }

    /// Reads the job state from the service and feeds it through the monitor.
    pub async fn refresh(&self) -> Result<JobStatus, JobError> {
        let status = self.backends.service.current_state(&self.job_id).await?;
        self.backends
            .monitor
            .notify(ServiceNotification::new(&self.job_id, status.clone()));
        Ok(status)
    }

    /// Waits until the job is terminal or `timeout` elapses.
    pub async fn await_completion(&self, timeout: Duration) -> Result<Vec<Asset>, JobError> {
        self.await_completion_with_cancel(timeout, &CancellationToken::new())
            .await
    }

    /// Waits until the job is terminal, `timeout` elapses, or `cancel` fires.
    ///
    /// On `Finished`, returns one output asset per task in submission order,
    /// with file lists read from the store. Timeout and cancellation leave
    /// the remote job running.
    pub async fn await_completion_with_cancel(
        &self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<Asset>, JobError> {
        debug!("Waiting up to {:?} for job {}", timeout, self.job_id);

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Stopped waiting for job {} (cancelled)", self.job_id);
                return Err(JobError::Cancelled { job_id: self.job_id.clone() });
            }
            result = tokio::time::timeout(timeout, self.wait_terminal()) => match result {
                Ok(status) => status?,
                Err(_) => {
                    warn!("Job {} still running after {:?}", self.job_id, timeout);
                    return Err(JobError::Timeout {
                        job_id: self.job_id.clone(),
                        timeout,
                    });
                }
            },
        };

        if status.state != JobState::Finished {
            let failure = JobFailure {
                job_id: self.job_id.clone(),
                job_name: self.name.clone(),
                state: status.state,
                message: status.message,
            };
            warn!("{}", failure);
            return Err(JobError::Failed(failure));
        }

        let outputs = self.collect_outputs().await?;
        info!(
            "Job {} finished with {} output assets",
            self.job_id,
            outputs.len()
        );
        Ok(outputs)
    }

    /// Resolves once the monitor has recorded a terminal state.
    async fn wait_terminal(&self) -> Result<JobStatus, JobError> {
        let mut rx = self.tracker.subscribe();
        let mut ticker = self.reconcile_interval.map(tokio::time::interval);

        loop {
            tokio::select! {
                changed = rx.wait_for(|s| s.as_ref().is_some_and(|s| s.state.is_terminal())) => {
                    return match changed {
                        Ok(status) => status
                            .clone()
                            .ok_or_else(|| JobError::MonitorClosed(self.job_id.clone())),
                        Err(_) => Err(JobError::MonitorClosed(self.job_id.clone())),
                    };
                }
                _ = tick(&mut ticker) => {
                    self.refresh().await?;
                }
            }
        }
    }

    async fn collect_outputs(&self) -> Result<Vec<Asset>, JobError> {
        let mut assets = Vec::with_capacity(self.outputs.len());
        for declared in &self.outputs {
            let mut asset = declared.clone();
            asset.files = self.backends.store.list_files(&asset.id).await?;
            assets.push(asset);
        }
        Ok(assets)
    }
}

/// Ticks the interval if reconciliation is enabled, otherwise never resolves.
async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        self.backends.monitor.unregister(&self.job_id);
    }
}
