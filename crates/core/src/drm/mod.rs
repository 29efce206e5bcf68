//! Content protection templates.
//!
//! Builds the token restriction and license response templates a key
//! delivery service is configured with. Both serialize to opaque JSON
//! strings handed to the service as-is.

mod error;
mod types;

pub use error::TemplateError;
pub use types::{
    serialize_license_template, serialize_token_template, LicenseResponseTemplate,
    LicenseTemplate, LicenseType, SymmetricVerificationKey, TokenClaim,
    TokenRestrictionTemplate, TokenType, CONTENT_KEY_ID_CLAIM_TYPE, SYMMETRIC_KEY_LEN,
};
