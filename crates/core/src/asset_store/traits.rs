//! Trait definitions for the asset store module.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::AssetStoreError;
use super::types::{
    AccessPermissions, AccessPolicy, Asset, AssetCreationOptions, AssetFile, Locator, LocatorKind,
};

/// A storage-backed asset store.
///
/// Every method is a remote call. None of them are idempotent: calling
/// `create_asset` twice creates two assets.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Returns the name of this store implementation.
    fn name(&self) -> &str;

    /// Creates an empty asset.
    async fn create_asset(
        &self,
        name: &str,
        options: AssetCreationOptions,
    ) -> Result<Asset, AssetStoreError>;

    /// Deletes an asset and all of its files.
    async fn delete_asset(&self, asset_id: &str) -> Result<(), AssetStoreError>;

    /// Registers an empty file slot on the asset.
    async fn create_file(&self, asset: &Asset, name: &str) -> Result<AssetFile, AssetStoreError>;

    /// Lists the files currently held by the asset.
    async fn list_files(&self, asset_id: &str) -> Result<Vec<AssetFile>, AssetStoreError>;

    /// Streams local bytes into the file through a write locator.
    ///
    /// Returns the number of bytes uploaded.
    async fn upload_file(
        &self,
        file: &AssetFile,
        locator: &Locator,
        source: &Path,
    ) -> Result<u64, AssetStoreError>;

    /// Streams the file's bytes into `destination`.
    ///
    /// Returns the number of bytes written.
    async fn download_file(
        &self,
        file: &AssetFile,
        destination: &Path,
    ) -> Result<u64, AssetStoreError>;

    /// Creates an access policy valid from now for `duration`.
    async fn create_policy(
        &self,
        name: &str,
        duration: Duration,
        permissions: AccessPermissions,
    ) -> Result<AccessPolicy, AssetStoreError>;

    /// Revokes an access policy.
    async fn delete_policy(&self, policy_id: &str) -> Result<(), AssetStoreError>;

    /// Creates a locator binding `asset` to `policy`.
    async fn create_locator(
        &self,
        kind: LocatorKind,
        asset: &Asset,
        policy: &AccessPolicy,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Locator, AssetStoreError>;

    /// Revokes a locator.
    async fn delete_locator(&self, locator_id: &str) -> Result<(), AssetStoreError>;
}
