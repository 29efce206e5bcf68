//! Processor catalog - resolves processing capabilities by name.
//!
//! Names are matched as case-insensitive substrings so that vendor renames
//! ("Media Encoder" → "Media Encoder Standard") keep resolving. Among the
//! matches, the highest version wins; versions are parsed strictly.

mod error;
mod resolver;
mod types;

pub use error::CatalogError;
pub use resolver::{select_latest, ProcessorCatalog};
pub use types::{ParseVersionError, Processor, ProcessorVersion};
