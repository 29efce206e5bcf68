//! End-to-end workflows built from the components.
//!
//! - **Encode and publish**: ingest a file, encode it with a preset, and
//!   publish the output's manifest for streaming
//! - **Index and download**: ingest a file, run the indexer, and download
//!   the index files locally
//!
//! Both wait for their job under the orchestrator's completion timeout and
//! stop early when the caller's cancellation token fires.

mod config;
mod error;
mod media;

pub use config::{WorkflowConfig, WorkflowKind};
pub use error::WorkflowError;
pub use media::{EncodeOutcome, IndexOutcome, MediaWorkflow, ProtectionTemplates};
