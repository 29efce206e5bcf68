//! Error types for remote processing service calls.

use thiserror::Error;

/// Errors that can occur when talking to the processing service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Processing service unavailable: {0}")]
    Unavailable(String),

    #[error("Request timeout")]
    Timeout,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ServiceError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Whether a caller may reasonably retry the operation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Timeout => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
