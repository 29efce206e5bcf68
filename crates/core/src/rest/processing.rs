//! REST implementation of the processing service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::client::{segment, RestClient};
use crate::asset_store::{Asset, AssetCreationOptions};
use crate::catalog::Processor;
use crate::config::ProcessingConfig;
use crate::service::{
    JobStatus, NotificationSink, ProcessingService, ServiceError, ServiceNotification,
    TaskDefinition,
};

#[derive(Debug, Serialize)]
struct CreateJobRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct BindInputsRequest<'a> {
    asset_ids: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
struct AddOutputRequest<'a> {
    name: &'a str,
    options: AssetCreationOptions,
}

/// Processing service reached over HTTP.
///
/// Notifications are produced by polling: each subscription runs a task
/// that reads the job state every `poll_interval_ms` and pushes changes to
/// its sink until the job is terminal or the service is dropped.
pub struct RestProcessingService {
    client: RestClient,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl RestProcessingService {
    pub fn new(config: &ProcessingConfig) -> Result<Self, ServiceError> {
        let client = RestClient::new(
            &config.endpoint,
            &config.account_name,
            &config.account_key,
            Duration::from_secs(config.timeout_secs as u64),
        )?;

        Ok(Self {
            client,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            shutdown: CancellationToken::new(),
        })
    }

    fn job_path(job_id: &str) -> String {
        format!("/jobs/{}", segment(job_id))
    }

    fn task_path(job_id: &str, task_id: &str) -> String {
        format!("{}/tasks/{}", Self::job_path(job_id), segment(task_id))
    }
}

impl Drop for RestProcessingService {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Reads a job's state, mapping 404 to `JobNotFound`.
async fn fetch_state(client: &RestClient, job_id: &str) -> Result<JobStatus, ServiceError> {
    let request = client.request(Method::GET, &RestProcessingService::job_path(job_id));
    client
        .send_json::<JobStatus>(request)
        .await
        .map_err(|e| match e {
            e if e.is_not_found() => ServiceError::JobNotFound(job_id.to_string()),
            e => e.into(),
        })
}

/// Polls `job_id` and forwards state changes until terminal or cancelled.
async fn poll_job(
    client: RestClient,
    job_id: String,
    sink: Arc<dyn NotificationSink>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut last: Option<JobStatus> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Stopped polling job {}", job_id);
                return;
            }
            _ = ticker.tick() => {}
        }

        match fetch_state(&client, &job_id).await {
            Ok(status) => {
                if last.as_ref() == Some(&status) {
                    continue;
                }
                let terminal = status.state.is_terminal();
                sink.notify(ServiceNotification::new(&job_id, status.clone()));
                last = Some(status);
                if terminal {
                    debug!("Job {} is terminal, polling done", job_id);
                    return;
                }
            }
            Err(ServiceError::JobNotFound(_)) => {
                warn!("Job {} disappeared, polling stopped", job_id);
                return;
            }
            Err(e) => {
                warn!("Failed to poll job {}: {}", job_id, e);
            }
        }
    }
}

#[async_trait]
impl ProcessingService for RestProcessingService {
    fn name(&self) -> &str {
        "rest"
    }

    async fn list_processors(&self) -> Result<Vec<Processor>, ServiceError> {
        let request = self.client.request(Method::GET, "/processors");
        Ok(self.client.send_json(request).await?)
    }

    async fn create_job(&self, name: &str) -> Result<String, ServiceError> {
        let request = self
            .client
            .request(Method::POST, "/jobs")
            .json(&CreateJobRequest { name });
        let created: IdResponse = self.client.send_json(request).await?;
        debug!("Created remote job {}", created.id);
        Ok(created.id)
    }

    async fn add_task(&self, job_id: &str, task: &TaskDefinition) -> Result<String, ServiceError> {
        let path = format!("{}/tasks", Self::job_path(job_id));
        let request = self.client.request(Method::POST, &path).json(task);
        let created: IdResponse = self.client.send_json(request).await?;
        Ok(created.id)
    }

    async fn bind_inputs(
        &self,
        job_id: &str,
        task_id: &str,
        inputs: &[Asset],
    ) -> Result<(), ServiceError> {
        let path = format!("{}/inputs", Self::task_path(job_id, task_id));
        let body = BindInputsRequest {
            asset_ids: inputs.iter().map(|a| a.id.as_str()).collect(),
        };
        let request = self.client.request(Method::POST, &path).json(&body);
        self.client.send(request).await?;
        Ok(())
    }

    async fn add_output(
        &self,
        job_id: &str,
        task_id: &str,
        name: &str,
        options: AssetCreationOptions,
    ) -> Result<Asset, ServiceError> {
        let path = format!("{}/outputs", Self::task_path(job_id, task_id));
        let request = self
            .client
            .request(Method::POST, &path)
            .json(&AddOutputRequest { name, options });
        Ok(self.client.send_json(request).await?)
    }

    async fn subscribe(
        &self,
        job_id: &str,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<(), ServiceError> {
        tokio::spawn(poll_job(
            self.client.clone(),
            job_id.to_string(),
            sink,
            self.poll_interval,
            self.shutdown.child_token(),
        ));
        debug!("Polling job {} every {:?}", job_id, self.poll_interval);
        Ok(())
    }

    async fn submit(&self, job_id: &str) -> Result<(), ServiceError> {
        let path = format!("{}/submit", Self::job_path(job_id));
        let request = self.client.request(Method::POST, &path);
        self.client.send(request).await.map_err(|e| match e {
            e if e.is_not_found() => ServiceError::JobNotFound(job_id.to_string()),
            e => ServiceError::from(e),
        })?;
        Ok(())
    }

    async fn current_state(&self, job_id: &str) -> Result<JobStatus, ServiceError> {
        fetch_state(&self.client, job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::client::test_server::{closed_address, serve_once};
    use crate::service::JobState;

    fn config(endpoint: String) -> ProcessingConfig {
        ProcessingConfig {
            endpoint,
            account_name: "acct".to_string(),
            account_key: "key".to_string(),
            timeout_secs: 5,
            poll_interval_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_list_processors_decodes_and_authenticates() {
        let (base, head) = serve_once(
            200,
            r#"[{"id":"nb:mpid:1","name":"Azure Media Indexer","version":"1.2"}]"#,
        )
        .await;
        let service = RestProcessingService::new(&config(base)).unwrap();

        let processors = service.list_processors().await.unwrap();

        assert_eq!(processors.len(), 1);
        assert_eq!(processors[0].name, "Azure Media Indexer");
        let head = head.await.unwrap();
        assert!(head.starts_with("GET /processors "));
        assert!(head.to_lowercase().contains("authorization: basic "));
    }

    #[tokio::test]
    async fn test_current_state_decodes_status() {
        let (base, head) = serve_once(200, r#"{"state":"error","message":"bad input"}"#).await;
        let service = RestProcessingService::new(&config(base)).unwrap();

        let status = service.current_state("nb:jid:1").await.unwrap();

        assert_eq!(status.state, JobState::Error);
        assert_eq!(status.message.as_deref(), Some("bad input"));
        assert!(head.await.unwrap().starts_with("GET /jobs/nb%3Ajid%3A1 "));
    }

    #[tokio::test]
    async fn test_missing_job_is_job_not_found() {
        let (base, _head) = serve_once(404, "{}").await;
        let service = RestProcessingService::new(&config(base)).unwrap();

        let err = service.current_state("job-9").await.unwrap_err();
        assert!(matches!(err, ServiceError::JobNotFound(id) if id == "job-9"));
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let (base, _head) = serve_once(500, "boom").await;
        let service = RestProcessingService::new(&config(base)).unwrap();

        let err = service.create_job("x").await.unwrap_err();
        assert!(matches!(err, ServiceError::Api { status: 500, ref message } if message == "boom"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        let service = RestProcessingService::new(&config(closed_address().await)).unwrap();

        let err = service.list_processors().await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }
}
