//! Error types for workflows.

use std::path::PathBuf;

use thiserror::Error;

use crate::asset_store::AssetStoreError;
use crate::catalog::CatalogError;
use crate::drm::TemplateError;
use crate::orchestrator::JobError;

/// Errors that can end a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Store(#[from] AssetStoreError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    /// The indexer configuration file does not exist.
    #[error("Configuration file not found: {}", path.display())]
    ConfigurationNotFound { path: PathBuf },

    /// A finished job reported no output asset.
    #[error("Job {job_id} finished without an output asset")]
    NoOutput { job_id: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
