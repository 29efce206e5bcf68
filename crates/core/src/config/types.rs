use serde::{Deserialize, Serialize};

use crate::asset_store::IngestConfig;
use crate::drm::TokenType;
use crate::orchestrator::OrchestratorConfig;
use crate::publisher::PublisherConfig;
use crate::workflow::WorkflowConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub processing: ProcessingConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub token: Option<TokenConfig>,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

/// Processing service connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessingConfig {
    /// REST endpoint (e.g., "https://media.example.com/api")
    pub endpoint: String,
    pub account_name: String,
    pub account_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_processing_timeout")]
    pub timeout_secs: u32,
    /// How often subscriptions poll job state, in milliseconds (default: 5000)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_processing_timeout() -> u32 {
    30
}

fn default_poll_interval() -> u64 {
    5_000
}

/// Asset storage connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub account_name: String,
    pub account_key: String,
    /// Request timeout in seconds, including transfers (default: 3600)
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u32,
}

fn default_storage_timeout() -> u32 {
    3600
}

/// Token restriction settings for protected outputs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    pub issuer: String,
    pub audience: String,
    #[serde(default)]
    pub token_type: TokenType,
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub processing: SanitizedConnectionConfig,
    pub storage: SanitizedConnectionConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<TokenConfig>,
    pub ingest: IngestConfig,
    pub orchestrator: OrchestratorConfig,
    pub publisher: PublisherConfig,
    pub workflow: WorkflowConfig,
}

/// Connection settings with the account key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConnectionConfig {
    pub endpoint: String,
    pub account_name: String,
    pub account_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            processing: SanitizedConnectionConfig {
                endpoint: config.processing.endpoint.clone(),
                account_name: config.processing.account_name.clone(),
                account_key_configured: !config.processing.account_key.is_empty(),
                timeout_secs: config.processing.timeout_secs,
            },
            storage: SanitizedConnectionConfig {
                endpoint: config.storage.endpoint.clone(),
                account_name: config.storage.account_name.clone(),
                account_key_configured: !config.storage.account_key.is_empty(),
                timeout_secs: config.storage.timeout_secs,
            },
            token: config.token.clone(),
            ingest: config.ingest.clone(),
            orchestrator: config.orchestrator.clone(),
            publisher: config.publisher.clone(),
            workflow: config.workflow.clone(),
        }
    }
}
