//! Manifests: the type → name → version → asset record of what exists where

use crate::lock::{atomic_write, ManifestLock};
use crate::types::{Asset, AssetStatus, AssetType};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use trove_core::{AssetId, Result, TroveError, Version};

type VersionMap = BTreeMap<Version, Asset>;
type NameMap = BTreeMap<String, VersionMap>;

/// Mapping of every asset type to its named, versioned assets.
///
/// Every [`AssetType`] always has an entry, possibly empty. An asset stored
/// under `(type, name, version)` always carries exactly that type, name and
/// version.
#[derive(Debug, Clone)]
pub struct Manifest {
    types: BTreeMap<AssetType, NameMap>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Manifest {
    /// Create a new manifest with an empty section for each asset type
    pub fn new() -> Self {
        Self {
            types: AssetType::ALL
                .into_iter()
                .map(|t| (t, NameMap::new()))
                .collect(),
        }
    }

    /// Insert an asset, replacing any entry with the same key
    pub fn add_asset(&mut self, asset: Asset) {
        self.types
            .entry(asset.asset_type)
            .or_default()
            .entry(asset.name.clone())
            .or_default()
            .insert(asset.version, asset);
    }

    pub fn get_asset(&self, asset_type: AssetType, name: &str, version: Version) -> Option<&Asset> {
        self.versions_map(asset_type, name)?.get(&version)
    }

    pub fn has_asset(&self, asset_type: AssetType, name: &str, version: Version) -> bool {
        self.get_asset(asset_type, name, version).is_some()
    }

    /// Highest recorded version of a name, `None` if the name is unknown
    pub fn latest_version(&self, asset_type: AssetType, name: &str) -> Option<Version> {
        self.latest_asset(asset_type, name).map(|a| a.version)
    }

    pub fn latest_asset(&self, asset_type: AssetType, name: &str) -> Option<&Asset> {
        self.versions_map(asset_type, name)?
            .last_key_value()
            .map(|(_, asset)| asset)
    }

    /// All recorded versions of a name, ascending
    pub fn versions(&self, asset_type: AssetType, name: &str) -> Vec<Version> {
        self.versions_map(asset_type, name)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Asset names recorded for a type, sorted
    pub fn names(&self, asset_type: AssetType) -> Vec<&str> {
        self.types
            .get(&asset_type)
            .map(|names| names.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Every asset of one type, in key order
    pub fn assets_of(&self, asset_type: AssetType) -> impl Iterator<Item = &Asset> {
        self.types
            .get(&asset_type)
            .into_iter()
            .flat_map(|names| names.values())
            .flat_map(|versions| versions.values())
    }

    /// Every asset, in key order
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.types
            .values()
            .flat_map(|names| names.values())
            .flat_map(|versions| versions.values())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Asset> {
        self.types
            .values_mut()
            .flat_map(|names| names.values_mut())
            .flat_map(|versions| versions.values_mut())
    }

    /// Set the status of every asset
    pub fn set_status(&mut self, status: AssetStatus) {
        for asset in self.iter_mut() {
            asset.status = status;
        }
    }

    /// Number of asset versions recorded
    pub fn len(&self) -> usize {
        self.types
            .values()
            .flat_map(|names| names.values())
            .map(|versions| versions.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union of both manifests. Where a key exists in both, `other` wins.
    pub fn merge(&self, other: &Manifest) -> Manifest {
        let mut merged = self.clone();
        for asset in other.iter() {
            merged.add_asset(asset.clone());
        }
        merged
    }

    /// Copy cached publish metadata onto the assets of this manifest.
    ///
    /// Only keys already present in `self` are kept. Source paths and
    /// statuses stay as scanned.
    pub fn enrich(&self, cache: &Manifest) -> Manifest {
        let mut enriched = self.clone();
        for asset in enriched.iter_mut() {
            if let Some(cached) = cache.get_asset(asset.asset_type, &asset.name, asset.version) {
                asset.adopt_metadata(cached);
            }
        }
        enriched
    }

    /// Find an asset by name, optionally narrowed by type and version.
    ///
    /// Without a version the latest one is returned.
    pub fn lookup(
        &self,
        asset_type: Option<AssetType>,
        name: &str,
        version: Option<Version>,
    ) -> Result<&Asset> {
        let candidates: Vec<AssetType> = AssetType::ALL
            .into_iter()
            .filter(|t| asset_type.map_or(true, |wanted| wanted == *t))
            .filter(|t| self.versions_map(*t, name).is_some())
            .collect();

        let found_type = match candidates.as_slice() {
            [] => return Err(TroveError::AssetNotFound(name.to_string())),
            [t] => *t,
            _ => {
                return Err(TroveError::Manifest(format!(
                    "'{}' exists as more than one asset type; specify the type",
                    name
                )))
            }
        };

        let asset = match version {
            Some(v) => self.get_asset(found_type, name, v),
            None => self.latest_asset(found_type, name),
        };
        asset.ok_or_else(|| match version {
            Some(v) => TroveError::AssetNotFound(format!("{}_v{}", name, v)),
            None => TroveError::AssetNotFound(name.to_string()),
        })
    }

    fn versions_map(&self, asset_type: AssetType, name: &str) -> Option<&VersionMap> {
        self.types.get(&asset_type)?.get(name)
    }

    /// Serialize to pretty JSON with keys sorted at every level
    pub fn to_json_string(&self) -> Result<String> {
        let mut out: BTreeMap<&str, BTreeMap<&str, BTreeMap<String, &Asset>>> = BTreeMap::new();
        for (asset_type, names) in &self.types {
            let section = out.entry(asset_type.as_str()).or_default();
            for (name, versions) in names {
                let entry = section.entry(name.as_str()).or_default();
                for (version, asset) in versions {
                    entry.insert(version.to_string(), asset);
                }
            }
        }
        let mut json = serde_json::to_string_pretty(&out)?;
        json.push('\n');
        Ok(json)
    }

    /// Parse manifest JSON.
    ///
    /// The key path is authoritative for type, name and version. Entries with
    /// an unknown type, an unusable name or an unparseable version key are
    /// skipped.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: RawManifest = serde_json::from_str(json)?;
        let mut manifest = Manifest::new();

        for (type_key, names) in raw {
            let Ok(asset_type) = type_key.parse::<AssetType>() else {
                tracing::warn!(asset_type = %type_key, "skipping unknown asset type in manifest");
                continue;
            };
            for (name, versions) in names {
                if let Err(e) = Asset::validate_name(&name) {
                    tracing::warn!(asset = %name, error = %e, "skipping manifest entry with invalid name");
                    continue;
                }
                for (version_key, record) in versions {
                    let Ok(version) = Version::parse(&version_key) else {
                        tracing::warn!(
                            asset = %name,
                            version = %version_key,
                            "skipping manifest entry with invalid version key"
                        );
                        continue;
                    };
                    manifest.add_asset(record.into_asset(asset_type, &name, version));
                }
            }
        }

        Ok(manifest)
    }

    /// Load a manifest file, falling back to an empty manifest.
    ///
    /// A missing, unreadable or corrupt file is logged and never fatal.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match Self::load_strict(path) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => {
                tracing::warn!(path = %path.display(), "manifest not found, using an empty manifest");
                Manifest::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load manifest, using an empty manifest");
                Manifest::new()
            }
        }
    }

    /// Load a manifest file; `Ok(None)` when it does not exist
    pub fn load_strict(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::from_json_str(&content)
            .map(Some)
            .map_err(|e| TroveError::Manifest(format!("{} is corrupt: {}", path.display(), e)))
    }

    /// Write the manifest atomically, creating parent directories
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        atomic_write(path, self.to_json_string()?.as_bytes())?;
        tracing::debug!(path = %path.display(), assets = self.len(), "saved manifest");
        Ok(())
    }

    /// Locked read-modify-write of a manifest file.
    ///
    /// The file is reloaded under an exclusive lock, `f` mutates it and the
    /// result is written back atomically. Nothing is written if `f` fails.
    /// A corrupt file is an error here rather than being replaced.
    pub fn update<P, T, F>(path: P, f: F) -> Result<T>
    where
        P: AsRef<Path>,
        F: FnOnce(&mut Manifest) -> Result<T>,
    {
        let path = path.as_ref();
        let _lock = ManifestLock::acquire(path)?;
        let mut manifest = Self::load_strict(path)?.unwrap_or_default();
        let value = f(&mut manifest)?;
        manifest.save(path)?;
        Ok(value)
    }
}

type RawManifest = BTreeMap<String, BTreeMap<String, BTreeMap<String, AssetRecord>>>;

/// On-disk shape of one asset entry; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssetRecord {
    name: Option<String>,
    version: Option<String>,
    author: Option<String>,
    id: Option<AssetId>,
    message: Option<String>,
    status: Option<AssetStatus>,
    #[serde(rename = "type")]
    asset_type: Option<String>,
    source_path: Option<PathBuf>,
    time: Option<String>,
}

impl AssetRecord {
    fn into_asset(self, asset_type: AssetType, name: &str, version: Version) -> Asset {
        let mismatched = self.name.as_deref().is_some_and(|n| n != name)
            || self
                .version
                .as_deref()
                .is_some_and(|v| Version::parse(v).ok() != Some(version))
            || self
                .asset_type
                .as_deref()
                .is_some_and(|t| t.parse::<AssetType>().ok() != Some(asset_type));
        if mismatched {
            tracing::warn!(
                asset = %name,
                version = %version,
                asset_type = %asset_type,
                "manifest record disagrees with its key, keeping the key"
            );
        }

        Asset {
            name: name.to_string(),
            version,
            author: self.author,
            id: self.id,
            message: self.message,
            status: self.status.unwrap_or_default(),
            asset_type,
            source_path: self.source_path.unwrap_or_default(),
            created_at: self.time,
        }
    }
}
