//! HTTP adapters for the processing service and the asset store.
//!
//! Both adapters share one request path: basic auth with the configured
//! account, a per-request timeout, JSON bodies, and a common mapping from
//! transport failures and HTTP statuses onto the domain error types.

mod client;
mod processing;
mod storage;

pub use processing::RestProcessingService;
pub use storage::RestAssetStore;
