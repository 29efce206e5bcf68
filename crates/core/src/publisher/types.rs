//! Types for streaming publication.

use serde::{Deserialize, Serialize};

use crate::asset_store::{AccessPolicy, Locator};

/// A published output asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedOutput {
    /// Streaming URL of the manifest file.
    pub url: String,
    pub manifest_name: String,
    pub locator: Locator,
    pub policy: AccessPolicy,
}

impl PublishedOutput {
    /// URL a smooth-streaming player requests.
    pub fn manifest_url(&self) -> String {
        format!("{}/manifest", self.url)
    }
}

/// Result of a publish attempt.
///
/// A missing manifest is an expected outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Published(PublishedOutput),
    ManifestNotFound,
}

impl PublishOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Published(output) => Some(&output.url),
            Self::ManifestNotFound => None,
        }
    }
}
