//! Error types for the processor catalog.

use thiserror::Error;

use crate::service::ServiceError;

/// Errors that can occur while resolving a processor.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No processor name contains the filter.
    #[error("No processor matches {filter:?}")]
    ProcessorNotFound { filter: String },

    /// A matching processor reported an unparseable version.
    #[error("Processor {processor:?} has invalid version {version:?}")]
    InvalidVersion { processor: String, version: String },

    /// Listing processors failed.
    #[error("processing service error: {0}")]
    Service(#[from] ServiceError),
}
