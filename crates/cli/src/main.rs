use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediaflow_core::{
    load_config, validate_config, AssetStore, MediaWorkflow, ProcessingService, PublishOutcome,
    RestAssetStore, RestProcessingService, SanitizedConfig, StateMonitor, WorkflowKind,
};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MEDIAFLOW_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("mediaflow.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    let source = config
        .workflow
        .source
        .clone()
        .context("workflow.source must name the media file to process")?;

    // Create remote collaborators
    let service: Arc<dyn ProcessingService> = Arc::new(
        RestProcessingService::new(&config.processing)
            .context("Failed to create processing service client")?,
    );
    info!("Processing service at {}", config.processing.endpoint);

    let store: Arc<dyn AssetStore> = Arc::new(
        RestAssetStore::new(&config.storage).context("Failed to create asset store client")?,
    );
    info!("Asset store at {}", config.storage.endpoint);

    let monitor = Arc::new(StateMonitor::new());
    let workflow = MediaWorkflow::from_config(&config, service, store, monitor);

    // Stop waiting on Ctrl+C / SIGTERM; remote jobs keep running
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Shutdown signal received, abandoning wait");
        trigger.cancel();
    });

    match config.workflow.kind {
        WorkflowKind::EncodeAndPublish => {
            let outcome = workflow
                .encode_and_publish(&source, &cancel)
                .await
                .context("Encode workflow failed")?;
            match &outcome.publish {
                PublishOutcome::Published(output) => {
                    println!("{}", output.url);
                    info!("Smooth streaming URL: {}", output.manifest_url());
                }
                PublishOutcome::ManifestNotFound => {
                    warn!(
                        "Output asset {} has no streaming manifest",
                        outcome.output.id
                    );
                }
            }
            if let Some(protection) = &outcome.protection {
                info!("Token restriction template: {}", protection.token_restriction);
                info!("License response template: {}", protection.license_response);
            }
        }
        WorkflowKind::IndexAndDownload => {
            let outcome = workflow
                .index_and_download(
                    &source,
                    &config.workflow.output_dir,
                    config.workflow.configuration_file.as_deref(),
                    &cancel,
                )
                .await
                .context("Index workflow failed")?;
            for path in &outcome.files {
                println!("{}", path.display());
            }
        }
    }

    info!("Done");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
