//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the job orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// How long workflows wait for a job to reach a terminal state (seconds).
    #[serde(default = "default_completion_timeout")]
    pub completion_timeout_secs: u64,

    /// How often a waiting handle re-reads the job state from the service
    /// (milliseconds), in case a notification was lost. 0 disables it.
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_ms: u64,
}

fn default_completion_timeout() -> u64 {
    8 * 60 * 60 // 8 hours
}

fn default_reconcile_interval() -> u64 {
    60_000 // 1 minute
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            completion_timeout_secs: default_completion_timeout(),
            reconcile_interval_ms: default_reconcile_interval(),
        }
    }
}

impl OrchestratorConfig {
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }

    pub fn reconcile_interval(&self) -> Option<Duration> {
        (self.reconcile_interval_ms > 0).then(|| Duration::from_millis(self.reconcile_interval_ms))
    }

    /// Disables state reconciliation (notifications only).
    pub fn without_reconcile(mut self) -> Self {
        self.reconcile_interval_ms = 0;
        self
    }

    /// Sets the reconcile interval.
    pub fn with_reconcile_interval(mut self, interval: Duration) -> Self {
        self.reconcile_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Sets the completion timeout.
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout_secs = timeout.as_secs();
        self
    }
}
