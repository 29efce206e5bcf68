//! Mock asset store for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::asset_store::{
    AccessPermissions, AccessPolicy, Asset, AssetCreationOptions, AssetFile, AssetStore,
    AssetStoreError, FileState, Locator, LocatorKind,
};

/// A file held in memory by the mock store.
#[derive(Debug, Clone)]
struct StoredFile {
    file: AssetFile,
    contents: Vec<u8>,
}

/// Mock implementation of the AssetStore trait.
///
/// Keeps assets, files and grants in memory:
/// - File bytes are read from / written to the local filesystem on transfer
/// - Policies and locators are tracked as active until deleted
/// - Every trait call is recorded by name, including failed ones
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(MockAssetStore::new());
/// let client = AssetStoreClient::with_defaults(store.clone());
///
/// let asset = client.ingest(Path::new("/tmp/clip.mp4")).await?;
///
/// assert!(store.active_policies().await.is_empty());
/// assert_eq!(store.file_contents(&asset.id, "clip.mp4").await.unwrap(), bytes);
/// ```
#[derive(Debug)]
pub struct MockAssetStore {
    assets: Arc<RwLock<HashMap<String, Asset>>>,
    /// Files by asset id, in insertion order.
    files: Arc<RwLock<HashMap<String, Vec<StoredFile>>>>,
    policies: Arc<RwLock<HashMap<String, AccessPolicy>>>,
    created_policies: Arc<RwLock<Vec<AccessPolicy>>>,
    revoked_policies: Arc<RwLock<Vec<AccessPolicy>>>,
    locators: Arc<RwLock<HashMap<String, Locator>>>,
    created_locators: Arc<RwLock<Vec<Locator>>>,
    revoked_locators: Arc<RwLock<Vec<Locator>>>,
    /// Names of trait methods called, in order.
    calls: Arc<RwLock<Vec<String>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<AssetStoreError>>>,
    fail_uploads: Arc<RwLock<bool>>,
}

impl Default for MockAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAssetStore {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self {
            assets: Arc::new(RwLock::new(HashMap::new())),
            files: Arc::new(RwLock::new(HashMap::new())),
            policies: Arc::new(RwLock::new(HashMap::new())),
            created_policies: Arc::new(RwLock::new(Vec::new())),
            revoked_policies: Arc::new(RwLock::new(Vec::new())),
            locators: Arc::new(RwLock::new(HashMap::new())),
            created_locators: Arc::new(RwLock::new(Vec::new())),
            revoked_locators: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            fail_uploads: Arc::new(RwLock::new(false)),
        }
    }

    /// Set an error to be returned on the next operation.
    pub async fn set_next_error(&self, error: AssetStoreError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make every upload fail with `Unavailable`.
    pub async fn set_fail_uploads(&self, fail: bool) {
        *self.fail_uploads.write().await = fail;
    }

    /// Trait methods called so far, in order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }

    pub async fn asset_count(&self) -> usize {
        self.assets.read().await.len()
    }

    pub async fn get_asset(&self, asset_id: &str) -> Option<Asset> {
        self.assets.read().await.get(asset_id).cloned()
    }

    /// Bytes stored for a file, if it exists.
    pub async fn file_contents(&self, asset_id: &str, name: &str) -> Option<Vec<u8>> {
        self.files
            .read()
            .await
            .get(asset_id)?
            .iter()
            .find(|f| f.file.name == name)
            .map(|f| f.contents.clone())
    }

    /// Every policy ever created, including revoked ones.
    pub async fn created_policies(&self) -> Vec<AccessPolicy> {
        self.created_policies.read().await.clone()
    }

    pub async fn active_policies(&self) -> Vec<AccessPolicy> {
        self.policies.read().await.values().cloned().collect()
    }

    pub async fn revoked_policies(&self) -> Vec<AccessPolicy> {
        self.revoked_policies.read().await.clone()
    }

    /// Every locator ever created, including revoked ones.
    pub async fn created_locators(&self) -> Vec<Locator> {
        self.created_locators.read().await.clone()
    }

    pub async fn active_locators(&self) -> Vec<Locator> {
        self.locators.read().await.values().cloned().collect()
    }

    pub async fn revoked_locators(&self) -> Vec<Locator> {
        self.revoked_locators.read().await.clone()
    }

    /// Adds an asset without recording a call.
    pub async fn insert_asset(&self, name: &str, options: AssetCreationOptions) -> Asset {
        let asset = Asset {
            id: format!("nb:cid:UUID:{}", uuid::Uuid::new_v4()),
            name: name.to_string(),
            options,
            files: Vec::new(),
            created_at: Utc::now(),
        };
        self.assets
            .write()
            .await
            .insert(asset.id.clone(), asset.clone());
        self.files.write().await.insert(asset.id.clone(), Vec::new());
        asset
    }

    /// Adds an uploaded file to an existing asset without recording a call.
    ///
    /// Replaces any file with the same name.
    pub async fn insert_file(
        &self,
        asset_id: &str,
        name: &str,
        contents: &[u8],
    ) -> Result<AssetFile, AssetStoreError> {
        let mut files = self.files.write().await;
        let slot = files
            .get_mut(asset_id)
            .ok_or_else(|| AssetStoreError::AssetNotFound(asset_id.to_string()))?;

        let file = AssetFile {
            asset_id: asset_id.to_string(),
            name: name.to_string(),
            size_bytes: contents.len() as u64,
            state: FileState::Uploaded,
        };
        let stored = StoredFile {
            file: file.clone(),
            contents: contents.to_vec(),
        };
        match slot.iter_mut().find(|f| f.file.name == name) {
            Some(existing) => *existing = stored,
            None => slot.push(stored),
        }
        Ok(file)
    }

    async fn record(&self, call: &str) -> Result<(), AssetStoreError> {
        self.calls.write().await.push(call.to_string());
        match self.next_error.write().await.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn find_file(&self, file: &AssetFile) -> Result<StoredFile, AssetStoreError> {
        let files = self.files.read().await;
        let slot = files
            .get(&file.asset_id)
            .ok_or_else(|| AssetStoreError::AssetNotFound(file.asset_id.clone()))?;
        slot.iter()
            .find(|f| f.file.name == file.name)
            .cloned()
            .ok_or_else(|| AssetStoreError::FileNotFound {
                asset_id: file.asset_id.clone(),
                name: file.name.clone(),
            })
    }
}

#[async_trait]
impl AssetStore for MockAssetStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_asset(
        &self,
        name: &str,
        options: AssetCreationOptions,
    ) -> Result<Asset, AssetStoreError> {
        self.record("create_asset").await?;
        Ok(self.insert_asset(name, options).await)
    }

    async fn delete_asset(&self, asset_id: &str) -> Result<(), AssetStoreError> {
        self.record("delete_asset").await?;
        self.files.write().await.remove(asset_id);
        self.assets
            .write()
            .await
            .remove(asset_id)
            .map(|_| ())
            .ok_or_else(|| AssetStoreError::AssetNotFound(asset_id.to_string()))
    }

    async fn create_file(&self, asset: &Asset, name: &str) -> Result<AssetFile, AssetStoreError> {
        self.record("create_file").await?;
        let mut files = self.files.write().await;
        let slot = files
            .get_mut(&asset.id)
            .ok_or_else(|| AssetStoreError::AssetNotFound(asset.id.clone()))?;
        if slot.iter().any(|f| f.file.name == name) {
            return Err(AssetStoreError::rejected(409, format!("file {} exists", name)));
        }

        let file = AssetFile {
            asset_id: asset.id.clone(),
            name: name.to_string(),
            size_bytes: 0,
            state: FileState::Registered,
        };
        slot.push(StoredFile {
            file: file.clone(),
            contents: Vec::new(),
        });
        Ok(file)
    }

    async fn list_files(&self, asset_id: &str) -> Result<Vec<AssetFile>, AssetStoreError> {
        self.record("list_files").await?;
        self.files
            .read()
            .await
            .get(asset_id)
            .map(|slot| slot.iter().map(|f| f.file.clone()).collect())
            .ok_or_else(|| AssetStoreError::AssetNotFound(asset_id.to_string()))
    }

    async fn upload_file(
        &self,
        file: &AssetFile,
        locator: &Locator,
        source: &Path,
    ) -> Result<u64, AssetStoreError> {
        self.record("upload_file").await?;
        if *self.fail_uploads.read().await {
            return Err(AssetStoreError::Unavailable("upload interrupted".into()));
        }

        let active = self.locators.read().await.get(&locator.id).cloned();
        let locator = match active {
            Some(l) if l.kind == LocatorKind::Write && l.asset_id == file.asset_id => l,
            _ => return Err(AssetStoreError::AccessDenied(locator.id.clone())),
        };
        let policy = self.policies.read().await.get(&locator.policy_id).cloned();
        if !policy.is_some_and(|p| p.permissions.contains(AccessPermissions::WRITE)) {
            return Err(AssetStoreError::AccessDenied(locator.policy_id));
        }

        self.find_file(file).await?;
        let contents = tokio::fs::read(source).await?;
        let size = contents.len() as u64;
        self.insert_file(&file.asset_id, &file.name, &contents).await?;
        Ok(size)
    }

    async fn download_file(
        &self,
        file: &AssetFile,
        destination: &Path,
    ) -> Result<u64, AssetStoreError> {
        self.record("download_file").await?;
        let stored = self.find_file(file).await?;
        tokio::fs::write(destination, &stored.contents).await?;
        Ok(stored.contents.len() as u64)
    }

    async fn create_policy(
        &self,
        name: &str,
        duration: Duration,
        permissions: AccessPermissions,
    ) -> Result<AccessPolicy, AssetStoreError> {
        self.record("create_policy").await?;
        let policy = AccessPolicy {
            id: format!("nb:pid:UUID:{}", uuid::Uuid::new_v4()),
            name: name.to_string(),
            duration,
            permissions,
            created_at: Utc::now(),
        };
        self.policies
            .write()
            .await
            .insert(policy.id.clone(), policy.clone());
        self.created_policies.write().await.push(policy.clone());
        Ok(policy)
    }

    async fn delete_policy(&self, policy_id: &str) -> Result<(), AssetStoreError> {
        self.record("delete_policy").await?;
        let policy = self
            .policies
            .write()
            .await
            .remove(policy_id)
            .ok_or_else(|| AssetStoreError::GrantNotFound(policy_id.to_string()))?;
        self.revoked_policies.write().await.push(policy);
        Ok(())
    }

    async fn create_locator(
        &self,
        kind: LocatorKind,
        asset: &Asset,
        policy: &AccessPolicy,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Locator, AssetStoreError> {
        self.record("create_locator").await?;
        if !self.assets.read().await.contains_key(&asset.id) {
            return Err(AssetStoreError::AssetNotFound(asset.id.clone()));
        }
        if !self.policies.read().await.contains_key(&policy.id) {
            return Err(AssetStoreError::GrantNotFound(policy.id.clone()));
        }

        let id = format!("nb:lid:UUID:{}", uuid::Uuid::new_v4());
        let path = match kind {
            LocatorKind::Write => format!("https://mock.blob.local/{}/", asset.id),
            LocatorKind::Origin => format!("https://mock.origin.local/{}/", id),
        };
        let locator = Locator {
            id,
            kind,
            asset_id: asset.id.clone(),
            policy_id: policy.id.clone(),
            path,
            start_time,
            expires_at: policy.expires_at(),
        };
        self.locators
            .write()
            .await
            .insert(locator.id.clone(), locator.clone());
        self.created_locators.write().await.push(locator.clone());
        Ok(locator)
    }

    async fn delete_locator(&self, locator_id: &str) -> Result<(), AssetStoreError> {
        self.record("delete_locator").await?;
        let locator = self
            .locators
            .write()
            .await
            .remove(locator_id)
            .ok_or_else(|| AssetStoreError::GrantNotFound(locator_id.to_string()))?;
        self.revoked_locators.write().await.push(locator);
        Ok(())
    }
}
