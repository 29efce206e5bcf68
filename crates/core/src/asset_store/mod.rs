//! Asset store module: logical assets, file transfer, access grants.
//!
//! This module provides the `AssetStore` trait for the storage collaborator
//! and `AssetStoreClient`, which layers the ingest sequence on top of it:
//!
//! 1. create asset
//! 2. create file slot
//! 3. create a short-lived write policy (write + list)
//! 4. create a write locator
//! 5. upload bytes
//! 6. revoke locator, then policy
//!
//! Step 6 runs even when step 4 or 5 fails, so no live write credentials are
//! left behind.
//!
//! # Example
//!
//! ```ignore
//! use mediaflow_core::asset_store::{AssetStoreClient, IngestConfig};
//!
//! let client = AssetStoreClient::new(store, IngestConfig::default());
//! let asset = client.ingest(Path::new("/media/abcd.mp4")).await?;
//! println!("Uploaded asset: {}", asset.id);
//! ```

mod client;
mod config;
mod error;
mod traits;
mod types;

pub use client::AssetStoreClient;
pub use config::IngestConfig;
pub use error::AssetStoreError;
pub use traits::AssetStore;
pub use types::{
    AccessPermissions, AccessPolicy, Asset, AssetCreationOptions, AssetFile, FileState, Locator,
    LocatorKind,
};
