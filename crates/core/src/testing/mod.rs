//! Testing utilities and mock implementations.
//!
//! This module provides in-memory implementations of the two remote
//! collaborators, so workflows can be exercised without real services.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediaflow_core::testing::{MockAssetStore, MockProcessingService};
//!
//! let store = Arc::new(MockAssetStore::new());
//! let service = Arc::new(MockProcessingService::with_asset_store(store.clone()));
//!
//! // Configure mock behavior
//! service.set_processors(vec![fixtures::processor("Indexer", "1.2")]).await;
//! service.set_transitions(vec![JobState::Scheduled, JobState::Processing, JobState::Finished]).await;
//! ```

mod mock_asset_store;
mod mock_processing_service;

pub use mock_asset_store::MockAssetStore;
pub use mock_processing_service::{MockProcessingService, RecordedJob, RecordedTask};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::catalog::Processor;

    /// Create a processor with a stable id derived from name and version.
    pub fn processor(name: &str, version: &str) -> Processor {
        Processor {
            id: format!(
                "nb:mpid:{}-{}",
                name.to_lowercase().replace(' ', "-"),
                version
            ),
            name: name.to_string(),
            vendor: Some("Mock Media".to_string()),
            description: None,
            version: version.to_string(),
        }
    }

    /// Statuses of a job that runs to completion.
    pub fn successful_run() -> Vec<crate::service::JobState> {
        use crate::service::JobState;
        vec![JobState::Scheduled, JobState::Processing, JobState::Finished]
    }
}
