//! End-to-end media workflows.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::config::WorkflowConfig;
use super::error::WorkflowError;
use crate::asset_store::{Asset, AssetCreationOptions, AssetStore, AssetStoreClient};
use crate::catalog::ProcessorCatalog;
use crate::config::{Config, TokenConfig};
use crate::drm::{
    serialize_license_template, serialize_token_template, LicenseResponseTemplate,
    TokenRestrictionTemplate,
};
use crate::monitor::StateMonitor;
use crate::orchestrator::{JobHandle, JobOrchestrator, TaskSpec};
use crate::publisher::{OutputPublisher, PublishOutcome};
use crate::service::ProcessingService;

/// Serialized key delivery templates for a protected output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionTemplates {
    pub token_restriction: String,
    pub license_response: String,
}

/// Result of [`MediaWorkflow::encode_and_publish`].
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    pub input: Asset,
    pub output: Asset,
    pub publish: PublishOutcome,
    /// Present when token restriction is configured.
    pub protection: Option<ProtectionTemplates>,
}

/// Result of [`MediaWorkflow::index_and_download`].
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub input: Asset,
    pub output: Asset,
    /// Local paths of the downloaded output files.
    pub files: Vec<PathBuf>,
}

/// Runs ingest, processing and delivery as one sequence.
pub struct MediaWorkflow {
    assets: AssetStoreClient,
    catalog: ProcessorCatalog,
    orchestrator: JobOrchestrator,
    publisher: OutputPublisher,
    config: WorkflowConfig,
    token: Option<TokenConfig>,
}

impl MediaWorkflow {
    pub fn new(
        assets: AssetStoreClient,
        catalog: ProcessorCatalog,
        orchestrator: JobOrchestrator,
        publisher: OutputPublisher,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            assets,
            catalog,
            orchestrator,
            publisher,
            config,
            token: None,
        }
    }

    /// Wires every component from the loaded configuration.
    pub fn from_config(
        config: &Config,
        service: Arc<dyn ProcessingService>,
        store: Arc<dyn AssetStore>,
        monitor: Arc<StateMonitor>,
    ) -> Self {
        let assets = AssetStoreClient::new(Arc::clone(&store), config.ingest.clone());
        let workflow = Self::new(
            assets.clone(),
            ProcessorCatalog::new(Arc::clone(&service)),
            JobOrchestrator::new(config.orchestrator.clone(), service, store, monitor),
            OutputPublisher::new(assets, config.publisher.clone()),
            config.workflow.clone(),
        );
        match &config.token {
            Some(token) => workflow.with_token(token.clone()),
            None => workflow,
        }
    }

    /// Generates protection templates for every encoded output.
    pub fn with_token(mut self, token: TokenConfig) -> Self {
        self.token = Some(token);
        self
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Ingests `source`, encodes it with the configured preset, and
    /// publishes the output for streaming.
    pub async fn encode_and_publish(
        &self,
        source: &Path,
        cancel: &CancellationToken,
    ) -> Result<EncodeOutcome, WorkflowError> {
        let input = self.assets.ingest(source).await?;
        let encoder = self.catalog.resolve(&self.config.encoder_processor).await?;

        let preset = &self.config.preset;
        let task = TaskSpec::new(format!("Encode {}", input.name), encoder, preset.as_str())
            .with_input(input.clone())
            .with_output(format!("{} encoded", input.name), AssetCreationOptions::None);
        let handle = self
            .orchestrator
            .job(format!("Encoding {} to {}", input.name, preset))
            .task(task)
            .submit()
            .await?;

        let output = self.await_single_output(&handle, cancel).await?;
        let publish = self.publisher.publish_for_streaming(&output).await?;
        if let Some(url) = publish.url() {
            info!("Streaming URL: {}", url);
        }

        let protection = self
            .token
            .as_ref()
            .map(protection_templates)
            .transpose()?;

        Ok(EncodeOutcome {
            input,
            output,
            publish,
            protection,
        })
    }

    /// Ingests `source`, runs the indexer on it, and downloads the index
    /// files into `output_dir`.
    ///
    /// The configuration file is read before anything is uploaded.
    pub async fn index_and_download(
        &self,
        source: &Path,
        output_dir: &Path,
        configuration_file: Option<&Path>,
        cancel: &CancellationToken,
    ) -> Result<IndexOutcome, WorkflowError> {
        let configuration = match configuration_file {
            Some(path) => read_configuration(path).await?,
            None => String::new(),
        };

        let input = self.assets.ingest(source).await?;
        let indexer = self.catalog.resolve(&self.config.indexer_processor).await?;

        let task = TaskSpec::new(format!("Index {}", input.name), indexer, configuration)
            .with_input(input.clone())
            .with_output(format!("{} index", input.name), AssetCreationOptions::None);
        let handle = self
            .orchestrator
            .job(format!("Indexing {}", input.name))
            .task(task)
            .submit()
            .await?;

        let output = self.await_single_output(&handle, cancel).await?;
        let files = self.assets.download_asset(&output, output_dir).await?;

        Ok(IndexOutcome {
            input,
            output,
            files,
        })
    }

    async fn await_single_output(
        &self,
        handle: &JobHandle,
        cancel: &CancellationToken,
    ) -> Result<Asset, WorkflowError> {
        let timeout = self.orchestrator.config().completion_timeout();
        let outputs = handle.await_completion_with_cancel(timeout, cancel).await?;
        outputs
            .into_iter()
            .next()
            .ok_or_else(|| WorkflowError::NoOutput {
                job_id: handle.id().to_string(),
            })
    }
}

async fn read_configuration(path: &Path) -> Result<String, WorkflowError> {
    tokio::fs::read_to_string(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => WorkflowError::ConfigurationNotFound {
            path: path.to_path_buf(),
        },
        _ => WorkflowError::Io(e),
    })
}

fn protection_templates(token: &TokenConfig) -> Result<ProtectionTemplates, WorkflowError> {
    let template = TokenRestrictionTemplate::new(&token.issuer, &token.audience)?
        .with_token_type(token.token_type);
    Ok(ProtectionTemplates {
        token_restriction: serialize_token_template(&template)?,
        license_response: serialize_license_template(&LicenseResponseTemplate::single())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::asset_store::AssetStoreError;
    use crate::catalog::CatalogError;
    use crate::drm::TokenType;
    use crate::orchestrator::{JobError, OrchestratorConfig};
    use crate::publisher::PublisherConfig;
    use crate::service::{JobState, JobStatus};
    use crate::testing::fixtures::{processor, successful_run};
    use crate::testing::{MockAssetStore, MockProcessingService};
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        store: Arc<MockAssetStore>,
        service: Arc<MockProcessingService>,
        workflow: MediaWorkflow,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MockAssetStore::new());
        let service = Arc::new(MockProcessingService::with_asset_store(store.clone()));
        service
            .set_processors(vec![
                processor("Media Encoder Standard", "4.7"),
                processor("Media Encoder Standard", "4.10"),
                processor("Azure Media Indexer", "1.2"),
            ])
            .await;
        service.set_transitions(successful_run()).await;

        let assets = AssetStoreClient::with_defaults(store.clone());
        let workflow = MediaWorkflow::new(
            assets.clone(),
            ProcessorCatalog::new(service.clone()),
            JobOrchestrator::new(
                OrchestratorConfig::default()
                    .without_reconcile()
                    .with_completion_timeout(Duration::from_secs(10)),
                service.clone(),
                store.clone(),
                Arc::new(StateMonitor::new()),
            ),
            OutputPublisher::new(assets, PublisherConfig::default()),
            WorkflowConfig::default(),
        );

        Fixture {
            dir: TempDir::new().unwrap(),
            store,
            service,
            workflow,
        }
    }

    fn source(f: &Fixture, name: &str) -> PathBuf {
        let path = f.dir.path().join(name);
        std::fs::write(&path, b"media bytes").unwrap();
        path
    }

    #[tokio::test]
    async fn test_encode_and_publish() {
        let f = fixture().await;
        f.service
            .set_output_files(vec![
                ("clip_720p.mp4".to_string(), b"video".to_vec()),
                ("clip.ism".to_string(), b"<smil/>".to_vec()),
            ])
            .await;
        let path = source(&f, "clip.mp4");

        let outcome = f
            .workflow
            .encode_and_publish(&path, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.input.name, "clip");
        assert_eq!(outcome.output.name, "clip encoded");
        assert!(outcome.publish.url().unwrap().ends_with("clip.ism"));
        assert!(outcome.protection.is_none());

        let jobs = f.service.recorded_jobs().await;
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name, "Encoding clip to H264 Adaptive Bitrate MP4 Set 720p");
        let task = &jobs[0].tasks[0];
        assert_eq!(task.definition.processor_id, processor("Media Encoder Standard", "4.10").id);
        assert_eq!(task.definition.configuration, "H264 Adaptive Bitrate MP4 Set 720p");
        assert_eq!(task.inputs[0].id, outcome.input.id);

        // Ingest grants are gone; the publish grants remain.
        let active = f.store.active_policies().await;
        assert_eq!(active.len(), 1);
        assert!(active[0].permissions.is_read_only());
    }

    #[tokio::test]
    async fn test_encode_without_manifest_is_not_published() {
        let f = fixture().await;
        f.service
            .set_output_files(vec![("clip.mp4".to_string(), b"video".to_vec())])
            .await;
        let path = source(&f, "clip.mp4");

        let outcome = f
            .workflow
            .encode_and_publish(&path, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.publish, PublishOutcome::ManifestNotFound);
        assert!(f.store.active_policies().await.is_empty());
    }

    #[tokio::test]
    async fn test_encode_job_failure() {
        let f = fixture().await;
        f.service
            .set_script(vec![
                JobStatus::new(JobState::Scheduled),
                JobStatus::new(JobState::Error).with_message("no video stream"),
            ])
            .await;
        let path = source(&f, "clip.mp4");

        let err = f
            .workflow
            .encode_and_publish(&path, &CancellationToken::new())
            .await
            .unwrap_err();

        let WorkflowError::Job(JobError::Failed(failure)) = err else {
            panic!("expected job failure");
        };
        assert_eq!(failure.state, JobState::Error);
        assert_eq!(failure.message.as_deref(), Some("no video stream"));
    }

    #[tokio::test]
    async fn test_encode_cancelled() {
        let f = fixture().await;
        f.service.set_transitions(vec![]).await;
        let path = source(&f, "clip.mp4");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = f
            .workflow
            .encode_and_publish(&path, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Job(JobError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn test_encode_with_token_generates_templates() {
        let f = fixture().await;
        let workflow = f.workflow.with_token(TokenConfig {
            issuer: "https://issuer.example/".to_string(),
            audience: "https://audience.example/".to_string(),
            token_type: TokenType::Jwt,
        });
        let path = f.dir.path().join("clip.mp4");
        std::fs::write(&path, b"media bytes").unwrap();

        let outcome = workflow
            .encode_and_publish(&path, &CancellationToken::new())
            .await
            .unwrap();

        let protection = outcome.protection.unwrap();
        assert!(protection.token_restriction.contains("\"JWT\""));
        assert!(protection.license_response.contains("license_templates"));
    }

    #[tokio::test]
    async fn test_index_and_download() {
        let f = fixture().await;
        f.service
            .set_output_files(vec![
                ("talk.aib".to_string(), b"binary index".to_vec()),
                ("talk.vtt".to_string(), b"WEBVTT".to_vec()),
            ])
            .await;
        let path = source(&f, "talk.mp4");
        let config_file = f.dir.path().join("indexer.xml");
        std::fs::write(&config_file, "<configuration/>").unwrap();
        let out = f.dir.path().join("index");

        let outcome = f
            .workflow
            .index_and_download(&path, &out, Some(&config_file), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.files, vec![out.join("talk.aib"), out.join("talk.vtt")]);
        assert_eq!(std::fs::read(out.join("talk.vtt")).unwrap(), b"WEBVTT");

        let jobs = f.service.recorded_jobs().await;
        assert_eq!(jobs[0].name, "Indexing talk");
        let task = &jobs[0].tasks[0];
        assert_eq!(task.definition.processor_id, processor("Azure Media Indexer", "1.2").id);
        assert_eq!(task.definition.configuration, "<configuration/>");
    }

    #[tokio::test]
    async fn test_index_without_configuration_file() {
        let f = fixture().await;
        let path = source(&f, "talk.mp4");
        let out = f.dir.path().join("index");

        f.workflow
            .index_and_download(&path, &out, None, &CancellationToken::new())
            .await
            .unwrap();

        let jobs = f.service.recorded_jobs().await;
        assert_eq!(jobs[0].tasks[0].definition.configuration, "");
    }

    #[tokio::test]
    async fn test_missing_configuration_file_uploads_nothing() {
        let f = fixture().await;
        let path = source(&f, "talk.mp4");
        let missing = f.dir.path().join("missing.xml");

        let err = f
            .workflow
            .index_and_download(&path, f.dir.path(), Some(&missing), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::ConfigurationNotFound { path } if path == missing));
        assert_eq!(f.store.asset_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_source_file() {
        let f = fixture().await;

        let err = f
            .workflow
            .encode_and_publish(&f.dir.path().join("nope.mp4"), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Store(AssetStoreError::InputNotFound { .. })));
        assert!(f.service.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_processor() {
        let f = fixture().await;
        f.service.set_processors(vec![processor("Thumbnailer", "1.0")]).await;
        let path = source(&f, "clip.mp4");

        let err = f
            .workflow
            .encode_and_publish(&path, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Catalog(CatalogError::ProcessorNotFound { .. })
        ));
        assert!(f.service.recorded_jobs().await.is_empty());
    }
}
