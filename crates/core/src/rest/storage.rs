//! REST implementation of the asset store.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use reqwest::{Body, Method};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::client::{segment, RestClient, RestError};
use crate::asset_store::{
    AccessPermissions, AccessPolicy, Asset, AssetCreationOptions, AssetFile, AssetStore,
    AssetStoreError, Locator, LocatorKind,
};
use crate::config::StorageConfig;

#[derive(Debug, Serialize)]
struct CreateAssetRequest<'a> {
    name: &'a str,
    options: AssetCreationOptions,
}

#[derive(Debug, Serialize)]
struct CreateFileRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct CreatePolicyRequest<'a> {
    name: &'a str,
    duration_secs: u64,
    permissions: AccessPermissions,
}

/// Policy as the store reports it.
#[derive(Debug, Deserialize)]
struct PolicyResponse {
    id: String,
    name: String,
    duration_secs: u64,
    permissions: AccessPermissions,
    created_at: DateTime<Utc>,
}

impl From<PolicyResponse> for AccessPolicy {
    fn from(p: PolicyResponse) -> Self {
        AccessPolicy {
            id: p.id,
            name: p.name,
            duration: Duration::from_secs(p.duration_secs),
            permissions: p.permissions,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateLocatorRequest<'a> {
    kind: LocatorKind,
    asset_id: &'a str,
    policy_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<DateTime<Utc>>,
}

/// Asset store reached over HTTP.
///
/// Metadata calls go to the configured endpoint with basic auth. Uploads go
/// straight to the write locator's address, which carries its own grant.
pub struct RestAssetStore {
    client: RestClient,
}

impl RestAssetStore {
    pub fn new(config: &StorageConfig) -> Result<Self, AssetStoreError> {
        let client = RestClient::new(
            &config.endpoint,
            &config.account_name,
            &config.account_key,
            Duration::from_secs(config.timeout_secs as u64),
        )?;
        Ok(Self { client })
    }

    fn asset_path(asset_id: &str) -> String {
        format!("/assets/{}", segment(asset_id))
    }

    /// Maps a 404 to `not_found`, everything else through the default mapping.
    fn or_not_found(e: RestError, not_found: impl FnOnce() -> AssetStoreError) -> AssetStoreError {
        if e.is_not_found() {
            not_found()
        } else {
            e.into()
        }
    }
}

#[async_trait]
impl AssetStore for RestAssetStore {
    fn name(&self) -> &str {
        "rest"
    }

    async fn create_asset(
        &self,
        name: &str,
        options: AssetCreationOptions,
    ) -> Result<Asset, AssetStoreError> {
        let request = self
            .client
            .request(Method::POST, "/assets")
            .json(&CreateAssetRequest { name, options });
        Ok(self.client.send_json(request).await?)
    }

    async fn delete_asset(&self, asset_id: &str) -> Result<(), AssetStoreError> {
        let request = self
            .client
            .request(Method::DELETE, &Self::asset_path(asset_id));
        self.client.send(request).await.map_err(|e| {
            Self::or_not_found(e, || AssetStoreError::AssetNotFound(asset_id.to_string()))
        })?;
        Ok(())
    }

    async fn create_file(&self, asset: &Asset, name: &str) -> Result<AssetFile, AssetStoreError> {
        let path = format!("{}/files", Self::asset_path(&asset.id));
        let request = self
            .client
            .request(Method::POST, &path)
            .json(&CreateFileRequest { name });
        Ok(self.client.send_json(request).await?)
    }

    async fn list_files(&self, asset_id: &str) -> Result<Vec<AssetFile>, AssetStoreError> {
        let path = format!("{}/files", Self::asset_path(asset_id));
        let request = self.client.request(Method::GET, &path);
        self.client.send_json(request).await.map_err(|e| {
            Self::or_not_found(e, || AssetStoreError::AssetNotFound(asset_id.to_string()))
        })
    }

    async fn upload_file(
        &self,
        file: &AssetFile,
        locator: &Locator,
        source: &Path,
    ) -> Result<u64, AssetStoreError> {
        let handle = tokio::fs::File::open(source).await?;
        let size = handle.metadata().await?.len();
        let url = format!("{}{}", locator.path, segment(&file.name));
        debug!("PUT {} bytes to {}", size, url);

        let request = self
            .client
            .http()
            .put(&url)
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(Body::wrap_stream(ReaderStream::new(handle)));
        self.client.send(request).await.map_err(|e| match e {
            RestError::Status { status: 403, .. } => AssetStoreError::AccessDenied(locator.id.clone()),
            e => e.into(),
        })?;
        Ok(size)
    }

    async fn download_file(
        &self,
        file: &AssetFile,
        destination: &Path,
    ) -> Result<u64, AssetStoreError> {
        let path = format!(
            "{}/files/{}/content",
            Self::asset_path(&file.asset_id),
            segment(&file.name)
        );
        let request = self.client.request(Method::GET, &path);
        let response = self.client.send(request).await.map_err(|e| {
            Self::or_not_found(e, || AssetStoreError::FileNotFound {
                asset_id: file.asset_id.clone(),
                name: file.name.clone(),
            })
        })?;

        let mut out = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(RestError::from)?;
            out.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        out.flush().await?;
        Ok(written)
    }

    async fn create_policy(
        &self,
        name: &str,
        duration: Duration,
        permissions: AccessPermissions,
    ) -> Result<AccessPolicy, AssetStoreError> {
        let body = CreatePolicyRequest {
            name,
            duration_secs: duration.as_secs(),
            permissions,
        };
        let request = self.client.request(Method::POST, "/policies").json(&body);
        let policy: PolicyResponse = self.client.send_json(request).await?;
        Ok(policy.into())
    }

    async fn delete_policy(&self, policy_id: &str) -> Result<(), AssetStoreError> {
        let path = format!("/policies/{}", segment(policy_id));
        let request = self.client.request(Method::DELETE, &path);
        self.client.send(request).await.map_err(|e| {
            Self::or_not_found(e, || AssetStoreError::GrantNotFound(policy_id.to_string()))
        })?;
        Ok(())
    }

    async fn create_locator(
        &self,
        kind: LocatorKind,
        asset: &Asset,
        policy: &AccessPolicy,
        start_time: Option<DateTime<Utc>>,
    ) -> Result<Locator, AssetStoreError> {
        let body = CreateLocatorRequest {
            kind,
            asset_id: &asset.id,
            policy_id: &policy.id,
            start_time,
        };
        let request = self.client.request(Method::POST, "/locators").json(&body);
        Ok(self.client.send_json(request).await?)
    }

    async fn delete_locator(&self, locator_id: &str) -> Result<(), AssetStoreError> {
        let path = format!("/locators/{}", segment(locator_id));
        let request = self.client.request(Method::DELETE, &path);
        self.client.send(request).await.map_err(|e| {
            Self::or_not_found(e, || AssetStoreError::GrantNotFound(locator_id.to_string()))
        })?;
        Ok(())
    }
}
