//! Job lifecycle integration tests.
//!
//! These tests drive a job through the public API end to end:
//! ingest -> resolve -> submit -> observe -> publish / download

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

use mediaflow_core::{
    testing::{fixtures, MockAssetStore, MockProcessingService},
    AssetStoreClient, JobError, JobOrchestrator, JobState, JobStateObserver, JobStatus,
    JobTransition, OrchestratorConfig, OutputPublisher, ProcessorCatalog, PublishOutcome,
    PublisherConfig, StateMonitor, TaskSpec,
};

/// Test helper wiring all components to the mocks.
struct TestHarness {
    store: Arc<MockAssetStore>,
    service: Arc<MockProcessingService>,
    monitor: Arc<StateMonitor>,
    assets: AssetStoreClient,
    catalog: ProcessorCatalog,
    orchestrator: JobOrchestrator,
    publisher: OutputPublisher,
    temp_dir: TempDir,
}

impl TestHarness {
    async fn new() -> Self {
        let store = Arc::new(MockAssetStore::new());
        let service = Arc::new(MockProcessingService::with_asset_store(store.clone()));
        service
            .set_processors(vec![
                fixtures::processor("Media Encoder Standard", "4.7"),
                fixtures::processor("Azure Media Indexer", "1.2"),
                fixtures::processor("Azure Media Indexer 2 Preview", "1.1"),
            ])
            .await;
        service.set_step_delay(Duration::from_millis(10)).await;

        let monitor = Arc::new(StateMonitor::new());
        let assets = AssetStoreClient::with_defaults(store.clone());

        Self {
            catalog: ProcessorCatalog::new(service.clone()),
            orchestrator: JobOrchestrator::new(
                OrchestratorConfig::default().with_reconcile_interval(Duration::from_millis(50)),
                service.clone(),
                store.clone(),
                monitor.clone(),
            ),
            publisher: OutputPublisher::new(assets.clone(), PublisherConfig::default()),
            store,
            service,
            monitor,
            assets,
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    fn write_source(&self, name: &str) -> std::path::PathBuf {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, b"not really a video").unwrap();
        path
    }
}

#[derive(Default)]
struct Timeline {
    states: Mutex<Vec<JobState>>,
}

impl JobStateObserver for Timeline {
    fn on_transition(&self, transition: &JobTransition) {
        self.states.lock().unwrap().push(transition.state);
    }
}

#[tokio::test]
async fn test_encode_then_publish() {
    let h = TestHarness::new().await;
    h.service.set_transitions(fixtures::successful_run()).await;
    h.service
        .set_output_files(vec![
            ("movie_1280x720.mp4".to_string(), b"video".to_vec()),
            ("movie.ism".to_string(), b"<smil/>".to_vec()),
        ])
        .await;

    let input = assert_ok!(h.assets.ingest(&h.write_source("movie.mp4")).await);
    let encoder = assert_ok!(h.catalog.resolve("media encoder").await);
    let timeline = Arc::new(Timeline::default());

    let handle = assert_ok!(
        h.orchestrator
            .job("Encoding movie")
            .task(
                TaskSpec::new("Encode movie", encoder, "H264 Multiple Bitrate 720p")
                    .with_input(input.clone()),
            )
            .observer(timeline.clone())
            .submit()
            .await
    );
    assert_eq!(h.monitor.tracked_jobs(), 1);

    let outputs = assert_ok!(handle.await_completion(Duration::from_secs(10)).await);
    assert_eq!(outputs.len(), 1);
    assert_eq!(
        *timeline.states.lock().unwrap(),
        vec![
            JobState::Queued,
            JobState::Scheduled,
            JobState::Processing,
            JobState::Finished
        ]
    );

    let outcome = assert_ok!(h.publisher.publish_for_streaming(&outputs[0]).await);
    let PublishOutcome::Published(published) = outcome else {
        panic!("expected the manifest to be published");
    };
    assert!(published.url.ends_with("movie.ism"));

    drop(handle);
    assert_eq!(h.monitor.tracked_jobs(), 0);
}

#[tokio::test]
async fn test_index_then_download() {
    let h = TestHarness::new().await;
    h.service.set_transitions(fixtures::successful_run()).await;
    h.service
        .set_output_files(vec![("talk.ttml".to_string(), b"<tt/>".to_vec())])
        .await;

    let input = assert_ok!(h.assets.ingest(&h.write_source("talk.wmv")).await);
    let indexer = assert_ok!(h.catalog.resolve("Indexer").await);
    assert_eq!(indexer.name, "Azure Media Indexer");

    let handle = assert_ok!(
        h.orchestrator
            .submit_job(
                "Indexing talk",
                vec![TaskSpec::new("Index talk", indexer, "").with_input(input)],
            )
            .await
    );
    let outputs = assert_ok!(handle.await_completion(Duration::from_secs(10)).await);

    let out_dir = h.temp_dir.path().join("index");
    let files = assert_ok!(h.assets.download_asset(&outputs[0], &out_dir).await);
    assert_eq!(files, vec![out_dir.join("talk.ttml")]);
    assert_eq!(std::fs::read(&files[0]).unwrap(), b"<tt/>");
}

#[tokio::test]
async fn test_failed_job_reports_diagnostics() {
    let h = TestHarness::new().await;
    h.service
        .set_script(vec![
            JobStatus::new(JobState::Scheduled),
            JobStatus::new(JobState::Processing),
            JobStatus::new(JobState::Error).with_message("An error has occurred. Stage: ApplyEncodeCommand."),
        ])
        .await;

    let input = assert_ok!(h.assets.ingest(&h.write_source("broken.mp4")).await);
    let encoder = assert_ok!(h.catalog.resolve("Encoder").await);
    let handle = assert_ok!(
        h.orchestrator
            .submit_job(
                "Encoding broken",
                vec![TaskSpec::new("Encode broken", encoder, "H264").with_input(input)],
            )
            .await
    );

    let err = assert_err!(handle.await_completion(Duration::from_secs(10)).await);
    let failure = err.failure().expect("job failure");
    assert_eq!(failure.state, JobState::Error);
    assert!(failure.message.as_deref().unwrap().contains("ApplyEncodeCommand"));
    assert!(h.store.active_policies().await.is_empty());
}

#[tokio::test]
async fn test_abandoned_wait_leaves_job_running() {
    let h = TestHarness::new().await;
    let input = assert_ok!(h.assets.ingest(&h.write_source("long.mp4")).await);
    let encoder = assert_ok!(h.catalog.resolve("Encoder").await);
    let handle = assert_ok!(
        h.orchestrator
            .submit_job(
                "Encoding long",
                vec![TaskSpec::new("Encode long", encoder, "H264").with_input(input)],
            )
            .await
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = assert_err!(
        handle
            .await_completion_with_cancel(Duration::from_secs(10), &cancel)
            .await
    );
    assert!(matches!(err, JobError::Cancelled { .. }));

    // The job is still live remotely and can finish later.
    h.service
        .push_state(handle.id(), JobStatus::new(JobState::Scheduled))
        .await;
    h.service
        .push_state(handle.id(), JobStatus::new(JobState::Processing))
        .await;
    h.service
        .push_state(handle.id(), JobStatus::new(JobState::Finished))
        .await;
    let outputs = assert_ok!(handle.await_completion(Duration::from_secs(10)).await);
    assert_eq!(outputs.len(), 1);
}
