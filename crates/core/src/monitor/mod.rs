//! State monitor - turns service notifications into observer callbacks.
//!
//! The monitor is the [`NotificationSink`] handed to the processing service.
//! Each registered job gets a [`JobTracker`] holding an append-only
//! transition log and a `watch` channel with the latest status, which the
//! orchestrator's completion wait listens on.
//!
//! Notifications for jobs that are not registered (or were unregistered when
//! their handle was dropped) are ignored.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::service::{JobState, JobStatus, NotificationSink, ServiceNotification};

/// One observed job state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobTransition {
    pub job_id: String,
    pub job_name: String,
    /// State before this transition (`None` for the first observed one).
    pub previous: Option<JobState>,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Receives every transition of the jobs it was registered for.
///
/// Called on the notification delivery path; must not block.
pub trait JobStateObserver: Send + Sync {
    fn on_transition(&self, transition: &JobTransition);
}

/// Default observer: logs each transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl JobStateObserver for LoggingObserver {
    fn on_transition(&self, transition: &JobTransition) {
        info!(
            job = %transition.job_name,
            state = %transition.state,
            time = %transition.timestamp.format("%Y_%-m_%-d__%I_%M_%S"),
            "Job state changed"
        );
    }
}

/// Tracking state for one registered job.
pub struct JobTracker {
    job_id: String,
    job_name: String,
    observers: Vec<Arc<dyn JobStateObserver>>,
    log: Mutex<Vec<JobTransition>>,
    status_tx: watch::Sender<Option<JobStatus>>,
}

impl JobTracker {
    fn new(job_id: String, job_name: String, observers: Vec<Arc<dyn JobStateObserver>>) -> Self {
        let (status_tx, _) = watch::channel(None);
        Self {
            job_id,
            job_name,
            observers,
            log: Mutex::new(Vec::new()),
            status_tx,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Every transition observed so far, oldest first.
    pub fn transitions(&self) -> Vec<JobTransition> {
        self.lock_log().clone()
    }

    /// Latest observed status.
    pub fn latest(&self) -> Option<JobStatus> {
        self.status_tx.borrow().clone()
    }

    /// Receiver that wakes on every recorded transition.
    pub fn subscribe(&self) -> watch::Receiver<Option<JobStatus>> {
        self.status_tx.subscribe()
    }

    fn lock_log(&self) -> MutexGuard<'_, Vec<JobTransition>> {
        self.log.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records a notification. Returns false if it was a duplicate or
    /// arrived after a terminal state.
    ///
    /// The log guard is held until observers ran and the watch channel was
    /// updated, so concurrent deliveries are applied one at a time and the
    /// channel never lags behind the log.
    fn record(&self, notification: ServiceNotification) -> bool {
        let mut log = self.lock_log();
        let previous = log.last().map(|t| t.state);
        let state = notification.status.state;

        if let Some(prev) = previous {
            if prev == state {
                return false;
            }
            if prev.is_terminal() {
                warn!(
                    "Ignoring {} notification for job {} already in terminal state {}",
                    state, self.job_id, prev
                );
                return false;
            }
            if !prev.is_valid_transition(state) {
                warn!(
                    "Unexpected transition {} -> {} for job {}",
                    prev, state, self.job_id
                );
            }
        }

        let transition = JobTransition {
            job_id: self.job_id.clone(),
            job_name: self.job_name.clone(),
            previous,
            state,
            message: notification.status.message.clone(),
            timestamp: notification.occurred_at,
        };
        log.push(transition.clone());

        for observer in &self.observers {
            observer.on_transition(&transition);
        }
        self.status_tx.send_replace(Some(notification.status));
        true
    }
}

/// Routes service notifications to registered jobs.
#[derive(Default)]
pub struct StateMonitor {
    jobs: Mutex<HashMap<String, Arc<JobTracker>>>,
}

impl StateMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<String, Arc<JobTracker>>> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts tracking a job. Must happen before the job is submitted.
    pub fn register(
        &self,
        job_id: &str,
        job_name: &str,
        observers: Vec<Arc<dyn JobStateObserver>>,
    ) -> Arc<JobTracker> {
        let tracker = Arc::new(JobTracker::new(
            job_id.to_string(),
            job_name.to_string(),
            observers,
        ));
        self.lock_jobs()
            .insert(job_id.to_string(), Arc::clone(&tracker));
        debug!("Monitoring job {} ({})", job_name, job_id);
        tracker
    }

    /// Stops tracking a job. Later notifications for it are ignored.
    pub fn unregister(&self, job_id: &str) -> bool {
        let removed = self.lock_jobs().remove(job_id).is_some();
        if removed {
            debug!("Stopped monitoring job {}", job_id);
        }
        removed
    }

    pub fn is_registered(&self, job_id: &str) -> bool {
        self.lock_jobs().contains_key(job_id)
    }

    pub fn tracked_jobs(&self) -> usize {
        self.lock_jobs().len()
    }
}

impl NotificationSink for StateMonitor {
    fn notify(&self, notification: ServiceNotification) {
        let tracker = self.lock_jobs().get(&notification.job_id).cloned();
        match tracker {
            Some(tracker) => {
                tracker.record(notification);
            }
            None => {
                debug!(
                    "Ignoring {} notification for unknown job {}",
                    notification.status.state, notification.job_id
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<(String, JobState)>>,
    }

    impl JobStateObserver for RecordingObserver {
        fn on_transition(&self, transition: &JobTransition) {
            self.seen
                .lock()
                .unwrap()
                .push((transition.job_name.clone(), transition.state));
        }
    }

    fn notify(monitor: &StateMonitor, job_id: &str, state: JobState) {
        monitor.notify(ServiceNotification::new(job_id, JobStatus::new(state)));
    }

    #[test]
    fn test_reports_every_transition() {
        let monitor = StateMonitor::new();
        let observer = Arc::new(RecordingObserver::default());
        let tracker = monitor.register("job-1", "Encode clip", vec![observer.clone()]);

        for state in [
            JobState::Queued,
            JobState::Scheduled,
            JobState::Processing,
            JobState::Finished,
        ] {
            notify(&monitor, "job-1", state);
        }

        let seen = observer.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], ("Encode clip".to_string(), JobState::Queued));
        assert_eq!(seen[3].1, JobState::Finished);

        let log = tracker.transitions();
        assert_eq!(log[0].previous, None);
        assert_eq!(log[1].previous, Some(JobState::Queued));
        assert_eq!(tracker.latest().unwrap().state, JobState::Finished);
    }

    #[test]
    fn test_unknown_job_is_ignored() {
        let monitor = StateMonitor::new();
        notify(&monitor, "ghost", JobState::Processing);
        assert_eq!(monitor.tracked_jobs(), 0);
    }

    #[test]
    fn test_unregistered_job_is_ignored() {
        let monitor = StateMonitor::new();
        let tracker = monitor.register("job-1", "job", vec![]);
        notify(&monitor, "job-1", JobState::Queued);
        assert!(monitor.unregister("job-1"));
        assert!(!monitor.is_registered("job-1"));

        notify(&monitor, "job-1", JobState::Scheduled);
        assert_eq!(tracker.transitions().len(), 1);
        assert!(!monitor.unregister("job-1"));
    }

    #[test]
    fn test_duplicates_and_post_terminal_are_dropped() {
        let monitor = StateMonitor::new();
        let tracker = monitor.register("job-1", "job", vec![]);

        notify(&monitor, "job-1", JobState::Queued);
        notify(&monitor, "job-1", JobState::Queued);
        notify(&monitor, "job-1", JobState::Scheduled);
        notify(&monitor, "job-1", JobState::Processing);
        notify(&monitor, "job-1", JobState::Error);
        notify(&monitor, "job-1", JobState::Processing);

        let states: Vec<_> = tracker.transitions().iter().map(|t| t.state).collect();
        assert_eq!(
            states,
            vec![
                JobState::Queued,
                JobState::Scheduled,
                JobState::Processing,
                JobState::Error
            ]
        );
    }

    #[test]
    fn test_unexpected_transition_is_still_reported() {
        let monitor = StateMonitor::new();
        let tracker = monitor.register("job-1", "job", vec![]);

        notify(&monitor, "job-1", JobState::Queued);
        notify(&monitor, "job-1", JobState::Finished);

        assert_eq!(tracker.latest().unwrap().state, JobState::Finished);
    }

    struct SlowObserver;

    impl JobStateObserver for SlowObserver {
        fn on_transition(&self, transition: &JobTransition) {
            if transition.state == JobState::Processing {
                std::thread::sleep(std::time::Duration::from_millis(200));
            }
        }
    }

    #[test]
    fn test_concurrent_notifications_keep_watch_in_step_with_log() {
        let monitor = Arc::new(StateMonitor::new());
        let tracker = monitor.register("job-1", "job", vec![Arc::new(SlowObserver)]);

        let slow = {
            let monitor = Arc::clone(&monitor);
            std::thread::spawn(move || notify(&monitor, "job-1", JobState::Processing))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        let fast = {
            let monitor = Arc::clone(&monitor);
            std::thread::spawn(move || {
                notify(&monitor, "job-1", JobState::Finished);
                notify(&monitor, "job-1", JobState::Finished);
            })
        };
        slow.join().unwrap();
        fast.join().unwrap();

        let log_last = tracker.transitions().last().unwrap().state;
        assert_eq!(log_last, JobState::Finished);
        assert_eq!(tracker.latest().unwrap().state, log_last);
    }

    #[tokio::test]
    async fn test_watch_wakes_on_transition() {
        let monitor = Arc::new(StateMonitor::new());
        let tracker = monitor.register("job-1", "job", vec![Arc::new(LoggingObserver)]);
        let mut rx = tracker.subscribe();

        let sink = Arc::clone(&monitor);
        tokio::spawn(async move {
            sink.notify(ServiceNotification::new(
                "job-1",
                JobStatus::new(JobState::Error).with_message("bad input"),
            ));
        });

        let status = rx
            .wait_for(|s| s.as_ref().is_some_and(|s| s.state.is_terminal()))
            .await
            .unwrap()
            .clone()
            .unwrap();
        assert_eq!(status.state, JobState::Error);
        assert_eq!(status.message.as_deref(), Some("bad input"));
    }
}
