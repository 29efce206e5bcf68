//! Streaming publication of output assets.

use chrono::Utc;
use tracing::{info, warn};

use super::config::PublisherConfig;
use super::types::{PublishOutcome, PublishedOutput};
use crate::asset_store::{AccessPermissions, Asset, AssetStoreClient, AssetStoreError, LocatorKind};

/// Makes output assets reachable through a streaming origin.
pub struct OutputPublisher {
    client: AssetStoreClient,
    config: PublisherConfig,
}

impl OutputPublisher {
    pub fn new(client: AssetStoreClient, config: PublisherConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Publishes the asset's manifest file for streaming.
    ///
    /// Looks for the manifest before creating any grant, so an asset
    /// without one leaves nothing behind. The read policy and origin
    /// locator stay active after this returns.
    pub async fn publish_for_streaming(
        &self,
        asset: &Asset,
    ) -> Result<PublishOutcome, AssetStoreError> {
        let Some(manifest) = asset
            .files
            .iter()
            .find(|f| f.has_extension(&self.config.manifest_extension))
        else {
            warn!(
                "Asset {} has no {} manifest, not publishing",
                asset.id, self.config.manifest_extension
            );
            return Ok(PublishOutcome::ManifestNotFound);
        };

        let policy = self
            .client
            .create_access_policy(
                &self.config.policy_name,
                self.config.policy_duration(),
                AccessPermissions::READ,
            )
            .await?;
        let start_time = Utc::now() - self.config.clock_skew();
        let locator = self
            .client
            .create_locator(LocatorKind::Origin, asset, &policy, Some(start_time))
            .await?;

        let url = locator.file_url(&manifest.name);
        info!("Published asset {} at {}", asset.id, url);

        Ok(PublishOutcome::Published(PublishedOutput {
            url,
            manifest_name: manifest.name.clone(),
            locator,
            policy,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::asset_store::AssetCreationOptions;
    use crate::testing::MockAssetStore;

    async fn asset_with_files(store: &MockAssetStore, names: &[&str]) -> Asset {
        let mut asset = store.insert_asset("output", AssetCreationOptions::None).await;
        for name in names {
            let file = store.insert_file(&asset.id, name, b"x").await.unwrap();
            asset.files.push(file);
        }
        asset
    }

    fn publisher(store: &Arc<MockAssetStore>) -> OutputPublisher {
        OutputPublisher::new(
            AssetStoreClient::with_defaults(store.clone()),
            PublisherConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_publishes_manifest_url() {
        let store = Arc::new(MockAssetStore::new());
        let asset = asset_with_files(&store, &["a.mp4", "b.ism"]).await;

        let outcome = publisher(&store).publish_for_streaming(&asset).await.unwrap();

        let PublishOutcome::Published(output) = outcome else {
            panic!("expected a published output");
        };
        assert!(output.url.ends_with("b.ism"));
        assert_eq!(output.url, format!("{}b.ism", output.locator.path));
        assert_eq!(output.manifest_name, "b.ism");
        assert!(output.manifest_url().ends_with("b.ism/manifest"));
        assert!(output.policy.permissions.is_read_only());
        assert_eq!(output.locator.kind, LocatorKind::Origin);
        assert!(output.locator.start_time.unwrap() < Utc::now());
    }

    #[tokio::test]
    async fn test_published_grants_stay_active() {
        let store = Arc::new(MockAssetStore::new());
        let asset = asset_with_files(&store, &["video.ISM", "video.mp4"]).await;

        publisher(&store).publish_for_streaming(&asset).await.unwrap();

        assert_eq!(store.active_policies().await.len(), 1);
        assert_eq!(store.active_locators().await.len(), 1);
        assert!(store.revoked_policies().await.is_empty());
        assert!(store.revoked_locators().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_manifest_creates_no_grants() {
        let store = Arc::new(MockAssetStore::new());
        let asset = asset_with_files(&store, &["a.mp4", "thumb.jpg"]).await;

        let outcome = publisher(&store).publish_for_streaming(&asset).await.unwrap();

        assert_eq!(outcome, PublishOutcome::ManifestNotFound);
        assert!(outcome.url().is_none());
        assert!(store.created_policies().await.is_empty());
        assert!(store.created_locators().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(MockAssetStore::new());
        let asset = asset_with_files(&store, &["b.ism"]).await;
        store
            .set_next_error(AssetStoreError::rejected(403, "forbidden"))
            .await;

        let err = publisher(&store)
            .publish_for_streaming(&asset)
            .await
            .unwrap_err();

        assert!(matches!(err, AssetStoreError::Rejected { status: 403, .. }));
    }
}
