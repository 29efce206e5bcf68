//! Types for asset store operations.

use std::fmt;
use std::ops::BitOr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Options applied when an asset is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCreationOptions {
    /// No encryption.
    #[default]
    None,
    /// Encrypted at rest by the store.
    StorageEncrypted,
    /// Protected with common encryption.
    CommonEncryptionProtected,
    /// Protected with envelope encryption.
    EnvelopeEncryptionProtected,
}

/// Upload state of a file slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// Slot exists, no bytes yet.
    Registered,
    /// Bytes have been uploaded.
    Uploaded,
}

/// A single named byte stream inside an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFile {
    /// Owning asset.
    pub asset_id: String,
    /// File name, unique within the asset.
    pub name: String,
    /// Size in bytes (0 until uploaded).
    #[serde(default)]
    pub size_bytes: u64,
    pub state: FileState,
}

impl AssetFile {
    /// Whether the file name ends with the given extension (case-insensitive).
    pub fn has_extension(&self, extension: &str) -> bool {
        self.name
            .to_lowercase()
            .ends_with(&extension.to_lowercase())
    }
}

/// A logical grouping of files held in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Identifier assigned by the store.
    pub id: String,
    /// Display name.
    pub name: String,
    #[serde(default)]
    pub options: AssetCreationOptions,
    /// Files in creation order.
    #[serde(default)]
    pub files: Vec<AssetFile>,
    pub created_at: DateTime<Utc>,
}

impl Asset {
    /// Returns the file with the given name, if present.
    pub fn file(&self, name: &str) -> Option<&AssetFile> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Set of permissions granted by an access policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessPermissions(u8);

impl AccessPermissions {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1);
    pub const WRITE: Self = Self(1 << 1);
    pub const LIST: Self = Self(1 << 2);

    /// Returns true if every permission in `other` is granted.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns true if only `READ` (and optionally `LIST`) is granted.
    pub fn is_read_only(self) -> bool {
        self.contains(Self::READ) && !self.contains(Self::WRITE)
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for AccessPermissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for AccessPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(Self::READ) {
            names.push("read");
        }
        if self.contains(Self::WRITE) {
            names.push("write");
        }
        if self.contains(Self::LIST) {
            names.push("list");
        }
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// Grants a permission set for a bounded duration starting at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub id: String,
    pub name: String,
    pub duration: Duration,
    pub permissions: AccessPermissions,
    pub created_at: DateTime<Utc>,
}

impl AccessPolicy {
    /// When the policy stops granting access.
    pub fn expires_at(&self) -> DateTime<Utc> {
        let duration = chrono::Duration::from_std(self.duration).unwrap_or(chrono::Duration::MAX);
        self.created_at
            .checked_add_signed(duration)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Kind of locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorKind {
    /// Upload-time, signed write access to the asset container.
    Write,
    /// Consumption-time delivery through a streaming origin.
    Origin,
}

impl LocatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocatorKind::Write => "write",
            LocatorKind::Origin => "origin",
        }
    }
}

/// Binds an asset and an access policy into a resolvable address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    pub id: String,
    pub kind: LocatorKind,
    pub asset_id: String,
    pub policy_id: String,
    /// Address prefix; file names are appended directly.
    pub path: String,
    /// Earliest time the locator is valid, if earlier than creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl Locator {
    /// Full address of a file reachable through this locator.
    pub fn file_url(&self, file_name: &str) -> String {
        format!("{}{}", self.path, file_name)
    }
}
