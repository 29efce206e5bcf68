//! Types shared with the remote processing service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of a remote job.
///
/// Driven by the remote service; only observed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Accepted, waiting for scheduling.
    Queued,
    /// Assigned to a processing unit.
    Scheduled,
    /// Running.
    Processing,
    /// Completed successfully (terminal).
    Finished,
    /// Failed (terminal).
    Error,
    /// Canceled (terminal).
    Canceled,
}

impl JobState {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Finished | JobState::Error | JobState::Canceled
        )
    }

    /// Returns true for terminal states other than `Finished`.
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != JobState::Finished
    }

    /// Whether `self -> next` is an edge of the job state machine.
    pub fn is_valid_transition(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Scheduled)
                | (Queued, Canceled)
                | (Scheduled, Processing)
                | (Scheduled, Error)
                | (Scheduled, Canceled)
                | (Processing, Finished)
                | (Processing, Error)
                | (Processing, Canceled)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Scheduled => "scheduled",
            JobState::Processing => "processing",
            JobState::Finished => "finished",
            JobState::Error => "error",
            JobState::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a job's state as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,
    /// Diagnostic message, usually only set on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl JobStatus {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Task execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOptions {
    #[default]
    None,
    /// Configuration payload is encrypted at rest by the service.
    ProtectedConfiguration,
}

/// Definition of a task to add to a remote job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub processor_id: String,
    /// Processor-specific configuration (preset name, XML, JSON...).
    pub configuration: String,
    #[serde(default)]
    pub options: TaskOptions,
}

/// A state change pushed by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceNotification {
    pub job_id: String,
    pub status: JobStatus,
    pub occurred_at: DateTime<Utc>,
}

impl ServiceNotification {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            occurred_at: Utc::now(),
        }
    }
}

/// Receives notifications pushed by the remote service.
///
/// Called on the service's own delivery task. Implementations must not block.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: ServiceNotification);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Scheduled.is_terminal());
        assert!(!JobState::Processing.is_terminal());
        assert!(JobState::Finished.is_terminal());
        assert!(JobState::Error.is_terminal());
        assert!(JobState::Canceled.is_terminal());
    }

    #[test]
    fn test_failure_states() {
        assert!(!JobState::Finished.is_failure());
        assert!(JobState::Error.is_failure());
        assert!(JobState::Canceled.is_failure());
        assert!(!JobState::Processing.is_failure());
    }

    #[test]
    fn test_state_machine_edges() {
        assert!(JobState::Queued.is_valid_transition(JobState::Scheduled));
        assert!(JobState::Scheduled.is_valid_transition(JobState::Processing));
        assert!(JobState::Processing.is_valid_transition(JobState::Finished));
        assert!(JobState::Processing.is_valid_transition(JobState::Error));
        assert!(JobState::Scheduled.is_valid_transition(JobState::Canceled));
        assert!(!JobState::Queued.is_valid_transition(JobState::Finished));
        assert!(!JobState::Finished.is_valid_transition(JobState::Processing));
        assert!(!JobState::Error.is_valid_transition(JobState::Queued));
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&JobState::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
        let parsed: JobState = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(parsed, JobState::Canceled);
        assert_eq!(JobState::Error.to_string(), "error");
    }

    #[test]
    fn test_status_message() {
        let status = JobStatus::new(JobState::Error).with_message("codec not supported");
        assert_eq!(status.message.as_deref(), Some("codec not supported"));

        let json = serde_json::to_string(&JobStatus::new(JobState::Queued)).unwrap();
        assert_eq!(json, r#"{"state":"queued"}"#);
    }
}
