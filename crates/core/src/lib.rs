pub mod asset_store;
pub mod catalog;
pub mod config;
pub mod drm;
pub mod monitor;
pub mod orchestrator;
pub mod publisher;
pub mod rest;
pub mod service;
pub mod testing;
pub mod workflow;

pub use asset_store::{
    AccessPermissions, AccessPolicy, Asset, AssetCreationOptions, AssetFile, AssetStore,
    AssetStoreClient, AssetStoreError, IngestConfig, Locator, LocatorKind,
};
pub use catalog::{CatalogError, Processor, ProcessorCatalog, ProcessorVersion};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ProcessingConfig,
    SanitizedConfig, StorageConfig, TokenConfig,
};
pub use drm::{TemplateError, TokenRestrictionTemplate, TokenType};
pub use monitor::{JobStateObserver, JobTransition, LoggingObserver, StateMonitor};
pub use orchestrator::{
    JobError, JobFailure, JobHandle, JobOrchestrator, OrchestratorConfig, TaskSpec,
};
pub use publisher::{OutputPublisher, PublishOutcome, PublishedOutput, PublisherConfig};
pub use rest::{RestAssetStore, RestProcessingService};
pub use service::{JobState, JobStatus, ProcessingService, ServiceError};
pub use workflow::{
    EncodeOutcome, IndexOutcome, MediaWorkflow, WorkflowConfig, WorkflowError, WorkflowKind,
};
