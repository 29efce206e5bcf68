//! Error types for the asset store module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during asset store operations.
#[derive(Debug, Error)]
pub enum AssetStoreError {
    /// Local source file does not exist.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Asset does not exist in the store.
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// File does not exist in the asset.
    #[error("File {name} not found in asset {asset_id}")]
    FileNotFound { asset_id: String, name: String },

    /// Policy or locator does not exist (or was already revoked).
    #[error("Access grant not found: {0}")]
    GrantNotFound(String),

    /// The locator does not permit the requested operation.
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The store could not be reached.
    #[error("Asset store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an error.
    #[error("Asset store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The store answered with something we could not decode.
    #[error("Invalid asset store response: {0}")]
    InvalidResponse(String),

    /// Local I/O error while streaming bytes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssetStoreError {
    /// Creates a new rejected error.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Whether a caller may reasonably retry the operation from scratch.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::Io(_) => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
