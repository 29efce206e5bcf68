//! Publisher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest accepted read grant (about ten years).
pub const MAX_POLICY_DURATION_DAYS: u64 = 3650;

/// Longest accepted locator back-dating (one day).
pub const MAX_CLOCK_SKEW_MINUTES: i64 = 24 * 60;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Configuration for streaming publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Name given to the read policy.
    #[serde(default = "default_policy_name")]
    pub policy_name: String,

    /// How long published outputs stay readable (days).
    #[serde(default = "default_policy_duration_days")]
    pub policy_duration_days: u64,

    /// How far before now the origin locator becomes valid (minutes).
    #[serde(default = "default_clock_skew_minutes")]
    pub clock_skew_minutes: i64,

    /// File extension identifying the streaming manifest.
    #[serde(default = "default_manifest_extension")]
    pub manifest_extension: String,
}

fn default_policy_name() -> String {
    "Streaming policy".to_string()
}

fn default_policy_duration_days() -> u64 {
    30
}

fn default_clock_skew_minutes() -> i64 {
    5
}

fn default_manifest_extension() -> String {
    ".ism".to_string()
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            policy_name: default_policy_name(),
            policy_duration_days: default_policy_duration_days(),
            clock_skew_minutes: default_clock_skew_minutes(),
            manifest_extension: default_manifest_extension(),
        }
    }
}

impl PublisherConfig {
    /// Read grant lifetime, capped at [`MAX_POLICY_DURATION_DAYS`].
    pub fn policy_duration(&self) -> Duration {
        let days = self.policy_duration_days.min(MAX_POLICY_DURATION_DAYS);
        Duration::from_secs(days * SECONDS_PER_DAY)
    }

    /// Locator back-dating, clamped to `0..=MAX_CLOCK_SKEW_MINUTES`.
    pub fn clock_skew(&self) -> chrono::Duration {
        let minutes = self.clock_skew_minutes.clamp(0, MAX_CLOCK_SKEW_MINUTES);
        chrono::Duration::try_minutes(minutes).unwrap_or_else(chrono::Duration::zero)
    }
}
