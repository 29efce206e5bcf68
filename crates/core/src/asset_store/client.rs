//! High-level asset store client: ingest, transfer, access grants.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::config::IngestConfig;
use super::error::AssetStoreError;
use super::traits::AssetStore;
use super::types::{
    AccessPermissions, AccessPolicy, Asset, AssetCreationOptions, AssetFile, FileState, Locator,
    LocatorKind,
};

/// Client wrapping an [`AssetStore`] with the ingest and download sequences.
#[derive(Clone)]
pub struct AssetStoreClient {
    store: Arc<dyn AssetStore>,
    config: IngestConfig,
}

impl AssetStoreClient {
    /// Create a new client.
    pub fn new(store: Arc<dyn AssetStore>, config: IngestConfig) -> Self {
        Self { store, config }
    }

    /// Create a client with the default ingest configuration.
    pub fn with_defaults(store: Arc<dyn AssetStore>) -> Self {
        Self::new(store, IngestConfig::default())
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    pub async fn create_asset(
        &self,
        name: &str,
        options: AssetCreationOptions,
    ) -> Result<Asset, AssetStoreError> {
        let asset = self.store.create_asset(name, options).await?;
        info!("Created asset {} ({})", asset.name, asset.id);
        Ok(asset)
    }

    /// Registers a file slot on the asset.
    pub async fn add_file(&self, asset: &Asset, name: &str) -> Result<AssetFile, AssetStoreError> {
        let file = self.store.create_file(asset, name).await?;
        debug!("Created asset file {} in {}", file.name, asset.id);
        Ok(file)
    }

    /// Streams `local_path` into `file` through `locator`.
    ///
    /// Fails with [`AssetStoreError::InputNotFound`] before any remote call
    /// if the local file does not exist.
    pub async fn upload(
        &self,
        file: &AssetFile,
        locator: &Locator,
        local_path: &Path,
    ) -> Result<u64, AssetStoreError> {
        ensure_input_exists(local_path).await?;
        info!("Uploading {} to asset {}", file.name, file.asset_id);
        let bytes = self.store.upload_file(file, locator, local_path).await?;
        info!("Done uploading {} ({} bytes)", file.name, bytes);
        Ok(bytes)
    }

    /// Streams `file` to `output_dir/<file name>`.
    pub async fn download(
        &self,
        file: &AssetFile,
        output_dir: &Path,
    ) -> Result<PathBuf, AssetStoreError> {
        let destination = download_destination(output_dir, &file.name)?;
        let bytes = self.store.download_file(file, &destination).await?;
        debug!("Downloaded {} to {:?} ({} bytes)", file.name, destination, bytes);
        Ok(destination)
    }

    /// Downloads every file of `asset` into `output_dir`, creating it if needed.
    pub async fn download_asset(
        &self,
        asset: &Asset,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, AssetStoreError> {
        tokio::fs::create_dir_all(output_dir).await?;

        let files = self.store.list_files(&asset.id).await?;
        let mut paths = Vec::with_capacity(files.len());
        for file in &files {
            paths.push(self.download(file, output_dir).await?);
        }

        info!(
            "Downloaded {} files of asset {} to {:?}",
            paths.len(),
            asset.id,
            output_dir
        );
        Ok(paths)
    }

    pub async fn create_access_policy(
        &self,
        name: &str,
        duration: Duration,
        permissions: AccessPermissions,
    ) -> Result<AccessPolicy, AssetStoreError> {
        let policy = self.store.create_policy(name, duration, permissions).await?;
        debug!(
            "Created access policy {} ({}) for {:?}",
            policy.id, permissions, duration
        );
        Ok(policy)
    }

    pub async fn revoke_policy(&self, policy: &AccessPolicy) -> Result<(), AssetStoreError> {
        self.store.delete_policy(&policy.id).await?;
        debug!("Revoked access policy {}", policy.id);
        Ok(())
    }

    pub async fn create_locator(
        &self,
        kind: LocatorKind,
        asset: &Asset,
        policy: &AccessPolicy,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Locator, AssetStoreError> {
        let locator = self
            .store
            .create_locator(kind, asset, policy, start_time)
            .await?;
        debug!(
            "Created {} locator {} for asset {}",
            kind.as_str(),
            locator.id,
            asset.id
        );
        Ok(locator)
    }

    pub async fn revoke_locator(&self, locator: &Locator) -> Result<(), AssetStoreError> {
        self.store.delete_locator(&locator.id).await?;
        debug!("Revoked locator {}", locator.id);
        Ok(())
    }

    /// Ingests a single local file as a new asset.
    ///
    /// The asset is named after the file stem and holds one file named after
    /// the file's base name. The temporary write policy and locator are
    /// revoked before returning, whether or not the upload succeeded.
    pub async fn ingest(&self, local_path: &Path) -> Result<Asset, AssetStoreError> {
        ensure_input_exists(local_path).await?;

        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AssetStoreError::InputNotFound {
                path: local_path.to_path_buf(),
            })?;
        let asset_name = local_path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());

        let mut asset = self
            .create_asset(&asset_name, AssetCreationOptions::None)
            .await?;
        let mut file = self.add_file(&asset, &file_name).await?;

        let policy = self
            .create_access_policy(
                &asset_name,
                self.config.policy_duration(),
                AccessPermissions::WRITE | AccessPermissions::LIST,
            )
            .await?;

        let uploaded = self.upload_through_locator(&asset, &file, &policy, local_path).await;
        let revoked = self.revoke_policy(&policy).await;

        let size_bytes = match (uploaded, revoked) {
            (Ok(size), Ok(())) => size,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), Ok(())) => return Err(e),
            (Err(e), Err(revoke_err)) => {
                warn!(
                    "Failed to revoke ingest policy {} after upload failure: {}",
                    policy.id, revoke_err
                );
                return Err(e);
            }
        };

        file.size_bytes = size_bytes;
        file.state = FileState::Uploaded;
        asset.files.push(file);

        info!("Ingested {:?} as asset {}", local_path, asset.id);
        Ok(asset)
    }

    /// Creates a write locator, uploads, and revokes the locator.
    async fn upload_through_locator(
        &self,
        asset: &Asset,
        file: &AssetFile,
        policy: &AccessPolicy,
        local_path: &Path,
    ) -> Result<u64, AssetStoreError> {
        let locator = self
            .create_locator(LocatorKind::Write, asset, policy, None)
            .await?;

        let uploaded = self.upload(file, &locator, local_path).await;
        let revoked = self.revoke_locator(&locator).await;

        match (uploaded, revoked) {
            (Ok(size), Ok(())) => Ok(size),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(revoke_err)) => {
                warn!(
                    "Failed to revoke write locator {} after upload failure: {}",
                    locator.id, revoke_err
                );
                Err(e)
            }
        }
    }
}

/// `output_dir/name`, provided `name` is a single plain path component.
fn download_destination(output_dir: &Path, name: &str) -> Result<PathBuf, AssetStoreError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) => Ok(output_dir.join(part)),
        _ => Err(AssetStoreError::InvalidResponse(format!(
            "asset file name {:?} is not a plain file name",
            name
        ))),
    }
}

/// Fails with `InputNotFound` unless `path` is an existing regular file.
async fn ensure_input_exists(path: &Path) -> Result<(), AssetStoreError> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(AssetStoreError::InputNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AssetStoreError::InputNotFound {
                path: path.to_path_buf(),
            })
        }
        Err(e) => Err(AssetStoreError::Io(e)),
    }
}
