//! Filesystem-backed central repository
//!
//! Published assets live at `<root>/<Type>/<name>/<name>_v<version>.<ext>`
//! and the authoritative record is `<root>/manifest.json`.

use crate::manifest::Manifest;
use crate::types::{Asset, AssetType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use trove_core::{Result, TroveError};

/// File name of the repository manifest, relative to the root
pub const MANIFEST_FILE: &str = "manifest.json";

/// `[repository]` section of the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Absolute path; `~`, `$VAR` and `${VAR}` are expanded
    pub root: String,
    /// Asset type names with a folder in the repository
    #[serde(default = "default_subfolders")]
    pub subfolder: Vec<String>,
}

fn default_subfolders() -> Vec<String> {
    AssetType::ALL.iter().map(|t| t.to_string()).collect()
}

/// The shared central store for published assets
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
    asset_types: BTreeSet<AssetType>,
    manifest_path: PathBuf,
}

impl Repository {
    /// Build a repository from configuration.
    ///
    /// The root must expand to an absolute path that can be created and
    /// written to.
    pub fn from_config(config: &RepositoryConfig) -> Result<Self> {
        let invalid = |reason: String| TroveError::InvalidRepositoryRoot {
            path: config.root.clone(),
            reason,
        };

        let root = expand_path(&config.root).map_err(invalid)?;
        if !root.is_absolute() {
            return Err(invalid("path is not absolute".to_string()));
        }

        let asset_types = config
            .subfolder
            .iter()
            .map(|name| name.parse::<AssetType>())
            .collect::<Result<BTreeSet<_>>>()?;

        let repo = Self::new(root, asset_types);
        repo.ensure_root()
            .map_err(|e| invalid(format!("not usable: {}", e)))?;
        Ok(repo)
    }

    /// Create a repository handle without touching the filesystem
    pub fn new(root: impl Into<PathBuf>, asset_types: impl IntoIterator<Item = AssetType>) -> Self {
        let root = root.into();
        Self {
            manifest_path: root.join(MANIFEST_FILE),
            asset_types: asset_types.into_iter().collect(),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn asset_types(&self) -> impl Iterator<Item = AssetType> + '_ {
        self.asset_types.iter().copied()
    }

    pub fn supports(&self, asset_type: AssetType) -> bool {
        self.asset_types.contains(&asset_type)
    }

    /// Create the root and check that files can be created inside it
    fn ensure_root(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)?;
        tempfile::tempfile_in(&self.root)?;
        Ok(())
    }

    /// Create the root and one folder per declared type. Idempotent.
    pub fn ensure_structure(&self) -> Result<()> {
        let created = !self.root.exists();
        fs::create_dir_all(&self.root)?;
        for asset_type in &self.asset_types {
            fs::create_dir_all(self.root.join(asset_type.as_str()))?;
        }
        if created {
            tracing::info!(root = %self.root.display(), "created central repository");
        }
        Ok(())
    }

    /// Folder holding every version of one asset type
    pub fn type_dir(&self, asset_type: AssetType) -> Result<PathBuf> {
        if !self.supports(asset_type) {
            return Err(TroveError::UnknownAssetType(asset_type.to_string()));
        }
        Ok(self.root.join(asset_type.as_str()))
    }

    /// Canonical location of an asset file. Touches nothing on disk.
    pub fn asset_location(&self, asset: &Asset) -> Result<PathBuf> {
        Asset::validate_name(&asset.name)?;
        Ok(self
            .type_dir(asset.asset_type)?
            .join(&asset.name)
            .join(asset.file_name()))
    }

    /// Like [`Repository::asset_location`], creating the asset folder if needed
    pub fn asset_path(&self, asset: &Asset) -> Result<PathBuf> {
        let path = self.asset_location(asset)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        Ok(path)
    }

    /// Current repository manifest; missing or corrupt reads as empty
    pub fn load_manifest(&self) -> Manifest {
        Manifest::load(&self.manifest_path)
    }

    /// Locked read-modify-write of the repository manifest
    pub fn update_manifest<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Manifest) -> Result<T>,
    {
        Manifest::update(&self.manifest_path, f)
    }
}

/// Expand a leading `~` and any `$VAR` / `${VAR}` references in a path
pub fn expand_path(raw: &str) -> std::result::Result<PathBuf, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("path is empty".to_string());
    }

    let mut expanded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('$') {
        expanded.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, remainder) = if let Some(braced) = after.strip_prefix('{') {
            let end = braced
                .find('}')
                .ok_or_else(|| format!("unterminated variable in '{}'", raw))?;
            (&braced[..end], &braced[end + 1..])
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], &after[end..])
        };

        if name.is_empty() {
            expanded.push('$');
            rest = after;
            continue;
        }
        let value =
            std::env::var(name).map_err(|_| format!("environment variable {} is not set", name))?;
        expanded.push_str(&value);
        rest = remainder;
    }
    expanded.push_str(rest);

    if expanded == "~" || expanded.starts_with("~/") || expanded.starts_with("~\\") {
        let home = dirs::home_dir().ok_or_else(|| "home directory is unknown".to_string())?;
        let tail = expanded[1..].trim_start_matches(['/', '\\']);
        return Ok(if tail.is_empty() { home } else { home.join(tail) });
    }

    Ok(PathBuf::from(expanded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use trove_core::Version;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trove_repo_test_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn config(root: &Path) -> RepositoryConfig {
        RepositoryConfig {
            root: root.display().to_string(),
            subfolder: vec!["Gizmo".into(), "Script".into()],
        }
    }

    #[test]
    fn test_from_config_creates_root() {
        let dir = temp_dir();
        let root = dir.join("central");
        let repo = Repository::from_config(&config(&root)).unwrap();

        assert!(root.is_dir());
        assert_eq!(repo.root(), root.as_path());
        assert_eq!(repo.manifest_path(), root.join("manifest.json").as_path());
        assert_eq!(repo.asset_types().count(), 2);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_from_config_rejects_relative_root() {
        let cfg = RepositoryConfig {
            root: "relative/repo".into(),
            subfolder: vec!["Gizmo".into()],
        };
        assert!(matches!(
            Repository::from_config(&cfg),
            Err(TroveError::InvalidRepositoryRoot { .. })
        ));
    }

    #[test]
    fn test_from_config_rejects_unknown_subfolder() {
        let dir = temp_dir();
        let mut cfg = config(&dir);
        cfg.subfolder.push("Plugin".into());
        assert!(matches!(
            Repository::from_config(&cfg),
            Err(TroveError::UnknownAssetType(_))
        ));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_from_config_expands_env() {
        let dir = temp_dir();
        std::env::set_var("TROVE_TEST_REPO_BASE", &dir);
        let cfg = RepositoryConfig {
            root: "${TROVE_TEST_REPO_BASE}/central".into(),
            subfolder: default_subfolders(),
        };
        let repo = Repository::from_config(&cfg).unwrap();
        assert_eq!(repo.root(), dir.join("central").as_path());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_ensure_structure_is_idempotent() {
        let dir = temp_dir();
        let repo = Repository::new(dir.join("repo"), AssetType::ALL);
        repo.ensure_structure().unwrap();
        repo.ensure_structure().unwrap();
        assert!(dir.join("repo/Gizmo").is_dir());
        assert!(dir.join("repo/Script").is_dir());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_asset_path_layout() {
        let dir = temp_dir();
        let repo = Repository::new(&dir, AssetType::ALL);
        let asset = Asset::new("blur", Version::new(1, 2, 0), AssetType::Gizmo, "/x/blur.gizmo");

        let path = repo.asset_path(&asset).unwrap();
        assert_eq!(path, dir.join("Gizmo/blur/blur_v1.2.0.gizmo"));
        assert!(dir.join("Gizmo/blur").is_dir());
        assert_eq!(asset.remote_path(&repo).unwrap(), path);

        let script = Asset::new("comp", Version::ZERO, AssetType::Script, "/x/comp.nk");
        assert_eq!(
            repo.asset_path(&script).unwrap(),
            dir.join("Script/comp/comp_v0.0.0.nk")
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_asset_location_creates_nothing() {
        let dir = temp_dir();
        let repo = Repository::new(dir.join("central"), AssetType::ALL);
        let asset = Asset::new("blur", Version::new(1, 0, 0), AssetType::Gizmo, "/x/blur.gizmo");

        let path = repo.asset_location(&asset).unwrap();
        assert_eq!(path, dir.join("central/Gizmo/blur/blur_v1.0.0.gizmo"));
        assert!(!dir.join("central").exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_asset_path_rejects_escaping_names() {
        let dir = temp_dir();
        let repo = Repository::new(dir.join("a/b/central"), AssetType::ALL);
        let evil = Asset::new(
            "../../../escaped",
            Version::new(1, 0, 0),
            AssetType::Gizmo,
            "/x/evil.gizmo",
        );

        assert!(matches!(
            repo.asset_location(&evil),
            Err(TroveError::InvalidAssetName(_))
        ));
        assert!(matches!(
            repo.asset_path(&evil),
            Err(TroveError::InvalidAssetName(_))
        ));
        assert!(!dir.join("escaped").exists());
        assert!(!dir.join("a").exists());

        fs::remove_dir_all(&dir).ok();
    }

    #[cfg(unix)]
    #[test]
    fn test_from_config_rejects_unwritable_root() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir();
        let root = dir.join("central");
        fs::create_dir_all(&root).unwrap();
        fs::set_permissions(&root, fs::Permissions::from_mode(0o555)).unwrap();

        // Privileged users write through permission bits; nothing to check then
        if tempfile::tempfile_in(&root).is_ok() {
            fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).ok();
            fs::remove_dir_all(&dir).ok();
            return;
        }

        let result = Repository::from_config(&config(&root));
        fs::set_permissions(&root, fs::Permissions::from_mode(0o755)).ok();
        assert!(matches!(
            result,
            Err(TroveError::InvalidRepositoryRoot { .. })
        ));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_asset_path_rejects_undeclared_type() {
        let dir = temp_dir();
        let repo = Repository::new(&dir, [AssetType::Gizmo]);
        let script = Asset::new("comp", Version::ZERO, AssetType::Script, "/x/comp.nk");
        assert!(matches!(
            repo.asset_path(&script),
            Err(TroveError::UnknownAssetType(_))
        ));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_expand_path() {
        std::env::set_var("TROVE_TEST_EXPAND", "/studio");
        assert_eq!(
            expand_path("$TROVE_TEST_EXPAND/assets").unwrap(),
            PathBuf::from("/studio/assets")
        );
        assert_eq!(
            expand_path("${TROVE_TEST_EXPAND}_x").unwrap(),
            PathBuf::from("/studio_x")
        );
        assert_eq!(expand_path("/plain/$").unwrap(), PathBuf::from("/plain/$"));
        assert!(expand_path("$TROVE_TEST_DEFINITELY_UNSET_VAR/x").is_err());
        assert!(expand_path("${TROVE_TEST_EXPAND").is_err());
        assert!(expand_path("  ").is_err());

        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_path("~/.nuke").unwrap(), home.join(".nuke"));
            assert_eq!(expand_path("~").unwrap(), home);
        }
    }
}
