//! Error types for content protection templates.

use thiserror::Error;

/// Errors that can occur when building or serializing templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Issuer or audience is not an absolute URL.
    #[error("Invalid {field} URL {value:?}: {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// A response template needs at least one license template.
    #[error("License response template has no license templates")]
    NoLicenseTemplates,

    #[error("Template serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
