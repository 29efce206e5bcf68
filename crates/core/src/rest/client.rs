//! Shared HTTP plumbing for the REST adapters.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::asset_store::AssetStoreError;
use crate::service::ServiceError;

/// Failure of a single REST call, before it is mapped to a domain error.
#[derive(Debug, Error)]
pub(crate) enum RestError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RestError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RestError::Timeout
        } else if e.is_decode() {
            RestError::Decode(e.to_string())
        } else {
            RestError::Connection(e.to_string())
        }
    }
}

impl RestError {
    pub(crate) fn is_not_found(&self) -> bool {
        matches!(self, RestError::Status { status: 404, .. })
    }
}

impl From<RestError> for ServiceError {
    fn from(e: RestError) -> Self {
        match e {
            RestError::Timeout => ServiceError::Timeout,
            RestError::Connection(msg) => ServiceError::Unavailable(msg),
            RestError::Status { status, message } => ServiceError::api(status, message),
            RestError::Decode(msg) => ServiceError::InvalidResponse(msg),
        }
    }
}

impl From<RestError> for AssetStoreError {
    fn from(e: RestError) -> Self {
        match e {
            RestError::Timeout => AssetStoreError::Unavailable("request timed out".to_string()),
            RestError::Connection(msg) => AssetStoreError::Unavailable(msg),
            RestError::Status { status, message } => AssetStoreError::rejected(status, message),
            RestError::Decode(msg) => AssetStoreError::InvalidResponse(msg),
        }
    }
}

/// Authenticated client bound to one endpoint.
#[derive(Clone)]
pub(crate) struct RestClient {
    http: Client,
    base_url: String,
    account_name: String,
    account_key: String,
}

impl RestClient {
    pub(crate) fn new(
        endpoint: &str,
        account_name: &str,
        account_key: &str,
        timeout: Duration,
    ) -> Result<Self, RestError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RestError::Connection(e.to_string()))?;

        Ok(Self {
            http,
            base_url: endpoint.trim_end_matches('/').to_string(),
            account_name: account_name.to_string(),
            account_key: account_key.to_string(),
        })
    }

    /// The underlying HTTP client, for requests outside the endpoint.
    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .basic_auth(&self.account_name, Some(&self.account_key))
    }

    /// Sends the request and turns non-success statuses into errors.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, RestError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RestError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }
        Ok(response)
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, RestError> {
        let response = self.send(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RestError::Decode(e.to_string()))
    }
}

/// Percent-encodes one path segment.
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_trims_trailing_slash() {
        let client = RestClient::new(
            "https://media.example.com/api/",
            "acct",
            "key",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.url("/jobs"), "https://media.example.com/api/jobs");
    }

    #[test]
    fn test_segment_encodes_ids() {
        assert_eq!(segment("nb:jid:UUID:1"), "nb%3Ajid%3AUUID%3A1");
    }

    #[test]
    fn test_status_mapping() {
        let err = RestError::Status {
            status: 503,
            message: "busy".into(),
        };
        let err: ServiceError = err.into();
        assert!(err.is_retryable());

        let err: AssetStoreError = RestError::Status {
            status: 409,
            message: "exists".into(),
        }
        .into();
        assert!(matches!(err, AssetStoreError::Rejected { status: 409, .. }));

        let err: ServiceError = RestError::Timeout.into();
        assert!(matches!(err, ServiceError::Timeout));
    }
}
