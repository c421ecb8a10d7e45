//! Asset type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use trove_core::{now_rfc3339, AssetId, Result, TroveError, Version};

/// Types of assets Trove can manage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetType {
    Gizmo,
    Script,
}

impl AssetType {
    /// Every supported type, in manifest order
    pub const ALL: [AssetType; 2] = [AssetType::Gizmo, AssetType::Script];

    /// Map a file suffix (with or without the leading dot) to its asset type
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix.trim_start_matches('.') {
            "gizmo" => Some(AssetType::Gizmo),
            "nk" => Some(AssetType::Script),
            _ => None,
        }
    }

    /// File extension used on disk, without the dot
    pub fn extension(self) -> &'static str {
        match self {
            AssetType::Gizmo => "gizmo",
            AssetType::Script => "nk",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Gizmo => "Gizmo",
            AssetType::Script => "Script",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = TroveError;

    fn from_str(s: &str) -> Result<Self> {
        AssetType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| TroveError::UnknownAssetType(s.to_string()))
    }
}

/// Lifecycle status of an asset, recomputed on every reconciliation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetStatus {
    #[serde(alias = "local")]
    Local,
    #[serde(alias = "non_local")]
    NonLocal,
    #[default]
    #[serde(alias = "unpublished")]
    Unpublished,
    #[serde(alias = "synced")]
    Synced,
    #[serde(alias = "published")]
    Published,
    #[serde(alias = "cached")]
    Cached,
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetStatus::Local => "local",
            AssetStatus::NonLocal => "not installed",
            AssetStatus::Unpublished => "unpublished",
            AssetStatus::Synced => "synced",
            AssetStatus::Published => "published",
            AssetStatus::Cached => "cached",
        };
        f.write_str(s)
    }
}

/// One version of one named asset.
///
/// Equality and hashing only look at `(name, version, asset_type)`, so the
/// same logical asset found at two different paths compares equal.
#[derive(Debug, Clone, Serialize)]
pub struct Asset {
    pub name: String,
    pub version: Version,
    pub author: Option<String>,
    pub id: Option<AssetId>,
    pub message: Option<String>,
    pub status: AssetStatus,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    pub source_path: PathBuf,
    #[serde(rename = "time")]
    pub created_at: Option<String>,
}

/// Result of deriving an asset from a file name
#[derive(Debug, Clone)]
pub struct ParsedAsset {
    pub asset: Asset,
    /// The file name carried no `_v` suffix and the version defaulted to `0.0.0`
    pub unversioned: bool,
}

impl Asset {
    /// Create a fresh, unpublished asset without metadata
    pub fn new(
        name: impl Into<String>,
        version: Version,
        asset_type: AssetType,
        source_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            author: None,
            id: None,
            message: None,
            status: AssetStatus::Unpublished,
            asset_type,
            source_path: source_path.into(),
            created_at: None,
        }
    }

    /// Reject names that cannot be used as a single path component.
    ///
    /// Names become directory and file names inside the repository and the
    /// install directory, so empty names and names with separators or `..`
    /// are refused.
    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(TroveError::InvalidAssetName(name.to_string()));
        }
        Ok(())
    }

    /// Derive name, version and type from a file path
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::parse_path(path).map(|parsed| parsed.asset)
    }

    /// Like [`Asset::from_path`], also reporting whether the version was defaulted
    pub fn parse_path<P: AsRef<Path>>(path: P) -> Result<ParsedAsset> {
        let path = path.as_ref();
        let unsupported = || TroveError::UnsupportedAssetType(path.display().to_string());

        let asset_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(AssetType::from_suffix)
            .ok_or_else(unsupported)?;
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(unsupported)?;

        let (name, version, unversioned) = match stem.split_once("_v") {
            Some((name, version)) => (name, Version::parse(version)?, false),
            None => (stem, Version::ZERO, true),
        };
        Self::validate_name(name)?;

        Ok(ParsedAsset {
            asset: Asset::new(name, version, asset_type, path),
            unversioned,
        })
    }

    /// Canonical file name: `{name}_v{version}.{ext}`
    pub fn file_name(&self) -> String {
        format!(
            "{}_v{}.{}",
            self.name,
            self.version,
            self.asset_type.extension()
        )
    }

    /// Check the publish precondition that a non-empty message is set
    pub fn ensure_message(&self) -> Result<()> {
        match self.message.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => Ok(()),
            _ => Err(TroveError::MissingMessage(self.to_string())),
        }
    }

    /// Fill author, timestamp and id. Fields already set are left alone.
    pub fn ensure_metadata(&mut self) {
        if self.author.is_none() {
            self.author = Some(current_user());
        }
        if self.created_at.is_none() {
            self.created_at = Some(now_rfc3339());
        }
        if self.id.is_none() {
            self.id = Some(AssetId::generate());
        }
    }

    /// Copy publish metadata from another record of the same asset
    pub fn adopt_metadata(&mut self, other: &Asset) {
        self.message = other.message.clone();
        self.author = other.author.clone();
        self.id = other.id.clone();
        self.created_at = other.created_at.clone();
    }

    /// Where this asset lives inside a repository
    pub fn remote_path(&self, repo: &crate::Repository) -> Result<PathBuf> {
        repo.asset_path(self)
    }
}

fn current_user() -> String {
    ["USER", "USERNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

impl PartialEq for Asset {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.asset_type == other.asset_type
    }
}

impl Eq for Asset {}

impl Hash for Asset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
        self.asset_type.hash(state);
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_v{}", self.name, self.version)
    }
}
