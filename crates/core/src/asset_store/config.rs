//! Configuration for asset ingest.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the ingest sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Lifetime of the temporary write policy, in seconds.
    #[serde(default = "default_policy_duration")]
    pub policy_duration_secs: u64,
}

fn default_policy_duration() -> u64 {
    3600 // 1 hour
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            policy_duration_secs: default_policy_duration(),
        }
    }
}

impl IngestConfig {
    pub fn policy_duration(&self) -> Duration {
        Duration::from_secs(self.policy_duration_secs)
    }

    /// Sets the write policy lifetime.
    pub fn with_policy_duration(mut self, duration: Duration) -> Self {
        self.policy_duration_secs = duration.as_secs();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.policy_duration(), Duration::from_secs(3600));
    }

    #[test]
    fn test_deserialize() {
        let config: IngestConfig = toml::from_str("policy_duration_secs = 120").unwrap();
        assert_eq!(config.policy_duration_secs, 120);

        let config: IngestConfig = toml::from_str("").unwrap();
        assert_eq!(config.policy_duration_secs, 3600);
    }
}
