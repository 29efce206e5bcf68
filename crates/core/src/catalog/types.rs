//! Types for the processor catalog.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use super::error::CatalogError;

/// Two to four dot-separated non-negative integers.
static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+){1,3}$").expect("valid version regex"));

/// A remote processing capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Processor {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Version string as reported by the service.
    pub version: String,
}

impl Processor {
    /// Parses the reported version strictly.
    pub fn parsed_version(&self) -> Result<ProcessorVersion, CatalogError> {
        self.version
            .parse()
            .map_err(|_| CatalogError::InvalidVersion {
                processor: self.name.clone(),
                version: self.version.clone(),
            })
    }

    /// Case-insensitive substring match on the processor name.
    pub fn matches(&self, filter: &str) -> bool {
        self.name.to_lowercase().contains(&filter.to_lowercase())
    }
}

/// A comparable `major.minor[.build[.revision]]` version.
///
/// An absent component orders before any present one, so `1.0 < 1.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessorVersion {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

impl ProcessorVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    fn key(&self) -> (u32, u32, Option<u32>, Option<u32>) {
        (self.major, self.minor, self.build, self.revision)
    }
}

impl PartialOrd for ProcessorVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProcessorVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// The input is not a valid processor version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseVersionError(pub String);

impl fmt::Display for ParseVersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid version: {:?}", self.0)
    }
}

impl std::error::Error for ParseVersionError {}

impl FromStr for ProcessorVersion {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !VERSION_PATTERN.is_match(s) {
            return Err(ParseVersionError(s.to_string()));
        }

        let parts = s
            .split('.')
            .map(|p| p.parse::<u32>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ParseVersionError(s.to_string()))?;

        Ok(Self {
            major: parts[0],
            minor: parts[1],
            build: parts.get(2).copied(),
            revision: parts.get(3).copied(),
        })
    }
}

impl fmt::Display for ProcessorVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
        }
        if let Some(revision) = self.revision {
            write!(f, ".{}", revision)?;
        }
        Ok(())
    }
}
