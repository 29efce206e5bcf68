use super::{types::Config, ConfigError};
use crate::publisher::{MAX_CLOCK_SKEW_MINUTES, MAX_POLICY_DURATION_DAYS};

/// Validate configuration
/// Currently validates:
/// - Required sections exist (enforced by serde)
/// - Endpoints and credentials are not empty
/// - Timeouts are not 0
/// - Publisher grant duration and clock skew are within bounds
/// - Token issuer/audience are not empty when a token section is present
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    require("processing.endpoint", &config.processing.endpoint)?;
    require("processing.account_name", &config.processing.account_name)?;
    require("processing.account_key", &config.processing.account_key)?;
    require("storage.endpoint", &config.storage.endpoint)?;
    require("storage.account_name", &config.storage.account_name)?;
    require("storage.account_key", &config.storage.account_key)?;

    if config.processing.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "processing.timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.storage.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "storage.timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.orchestrator.completion_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.completion_timeout_secs cannot be 0".to_string(),
        ));
    }

    let publisher = &config.publisher;
    if publisher.policy_duration_days == 0
        || publisher.policy_duration_days > MAX_POLICY_DURATION_DAYS
    {
        return Err(ConfigError::ValidationError(format!(
            "publisher.policy_duration_days must be between 1 and {}",
            MAX_POLICY_DURATION_DAYS
        )));
    }
    if !(0..=MAX_CLOCK_SKEW_MINUTES).contains(&publisher.clock_skew_minutes) {
        return Err(ConfigError::ValidationError(format!(
            "publisher.clock_skew_minutes must be between 0 and {}",
            MAX_CLOCK_SKEW_MINUTES
        )));
    }

    if let Some(token) = &config.token {
        require("token.issuer", &token.issuer)?;
        require("token.audience", &token.audience)?;
    }

    Ok(())
}

fn require(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }
    Ok(())
}
