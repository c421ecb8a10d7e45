//! Publish, install and scan orchestration
//!
//! A [`Session`] ties the central [`Repository`] to one user's local paths.
//! Publishing commits to the repository manifest under its lock; installing
//! only ever touches the local cached manifest.

use crate::manifest::Manifest;
use crate::reconcile::{reconcile_install, reconcile_publish, DriftReport};
use crate::repository::Repository;
use crate::resolver::{AbortReason, DecisionPort, Resolution, VersionResolver};
use crate::scanner::{scan_directory, SkippedFile};
use crate::types::{Asset, AssetStatus};
use std::fs;
use std::path::{Path, PathBuf};
use trove_core::{Result, TroveError};

/// File name of the per-user cached manifest inside the state directory
pub const CACHED_MANIFEST_FILE: &str = "cached_manifest.json";

/// Per-user filesystem locations
#[derive(Debug, Clone)]
pub struct LocalPaths {
    /// Root of the user's working tree, scanned for local assets
    pub nuke_dir: PathBuf,
    /// Where installed and freshly published assets are copied
    pub install_dir: PathBuf,
    /// Local record of everything published or installed by this user
    pub cached_manifest: PathBuf,
}

impl LocalPaths {
    pub fn new(
        nuke_dir: impl Into<PathBuf>,
        install_dir: impl Into<PathBuf>,
        state_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            nuke_dir: nuke_dir.into(),
            install_dir: install_dir.into(),
            cached_manifest: state_dir.as_ref().join(CACHED_MANIFEST_FILE),
        }
    }
}

/// Scanned local assets, enriched from the cache and reconciled
#[derive(Debug)]
pub struct LocalView {
    pub manifest: Manifest,
    pub drift: DriftReport,
    pub skipped: Vec<SkippedFile>,
}

#[derive(Debug, Clone)]
pub enum PublishOutcome {
    Published {
        /// The asset as recorded in the repository
        asset: Asset,
        /// Local install copy, when it succeeded
        installed_to: Option<PathBuf>,
    },
    Aborted {
        asset: Asset,
        reason: AbortReason,
    },
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

#[derive(Debug, Clone)]
pub enum InstallOutcome {
    Installed { asset: Asset, path: PathBuf },
    Aborted { asset: Asset },
}

impl InstallOutcome {
    pub fn is_installed(&self) -> bool {
        matches!(self, InstallOutcome::Installed { .. })
    }
}

/// One user's view of one repository
#[derive(Debug, Clone)]
pub struct Session {
    repository: Repository,
    paths: LocalPaths,
}

impl Session {
    pub fn new(repository: Repository, paths: LocalPaths) -> Self {
        Self { repository, paths }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn paths(&self) -> &LocalPaths {
        &self.paths
    }

    /// The cached manifest; absent is empty, corrupt is logged and empty
    pub fn cached_manifest(&self) -> Manifest {
        match Manifest::load_strict(&self.paths.cached_manifest) {
            Ok(Some(manifest)) => manifest,
            Ok(None) => Manifest::new(),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable cached manifest");
                Manifest::new()
            }
        }
    }

    /// Scan `scan_root`, enrich from the cache and reconcile against the
    /// repository.
    pub fn local_view(&self, scan_root: &Path) -> Result<LocalView> {
        let report = scan_directory(scan_root)?;
        let mut manifest = report.manifest.enrich(&self.cached_manifest());
        let remote = self.repository.load_manifest();
        let drift = reconcile_publish(&mut manifest, &remote);
        Ok(LocalView {
            manifest,
            drift,
            skipped: report.skipped,
        })
    }

    /// Repository manifest with install status relative to this user
    pub fn remote_view(&self) -> Manifest {
        let mut remote = self.repository.load_manifest();
        reconcile_install(&mut remote, &self.installed());
        remote
    }

    /// What this user has locally: the cache plus whatever sits in the
    /// working tree.
    fn installed(&self) -> Manifest {
        let cache = self.cached_manifest();
        if !self.paths.nuke_dir.is_dir() {
            return cache;
        }
        match scan_directory(&self.paths.nuke_dir) {
            Ok(report) => cache.merge(&report.manifest),
            Err(e) => {
                tracing::warn!(error = %e, "could not scan local assets");
                cache
            }
        }
    }

    /// Publish one local asset to the repository.
    ///
    /// The asset must carry a message. Version conflicts are resolved through
    /// `decisions`. The repository manifest is only written after the file
    /// copy succeeded.
    pub fn publish(&self, asset: Asset, decisions: &mut dyn DecisionPort) -> Result<PublishOutcome> {
        asset.ensure_message()?;
        self.repository.type_dir(asset.asset_type)?;
        self.repository.ensure_structure()?;

        let local_file = asset.source_path.clone();
        let mut candidate = asset;
        // Metadata enriched from the cache belongs to an earlier publish
        candidate.author = None;
        candidate.id = None;
        candidate.created_at = None;

        let published = loop {
            let remote = self.repository.load_manifest();
            let mut accepted = match VersionResolver::new(decisions).resolve(candidate, &remote)? {
                Resolution::Accepted(asset) => asset,
                Resolution::Aborted { asset, reason } => {
                    tracing::info!(asset = %asset, "publish cancelled");
                    return Ok(PublishOutcome::Aborted { asset, reason });
                }
            };
            accepted.ensure_metadata();

            match self.commit(&accepted, &local_file)? {
                Some(published) => break published,
                None => {
                    tracing::warn!(
                        asset = %accepted,
                        "version was published concurrently, resolving again"
                    );
                    candidate = accepted;
                }
            }
        };

        tracing::info!(
            asset = %published,
            path = %published.source_path.display(),
            "published"
        );

        let installed_to = match self.install_copy(&published) {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!(asset = %published, error = %e, "published, but the local install copy failed");
                None
            }
        };

        let cached = published.clone();
        if let Err(e) = Manifest::update(&self.paths.cached_manifest, |m| {
            m.add_asset(cached);
            Ok(())
        }) {
            tracing::warn!(asset = %published, error = %e, "published, but the cached manifest was not updated");
        }

        Ok(PublishOutcome::Published {
            asset: published,
            installed_to,
        })
    }

    /// Copy and record under the repository lock. `None` means another
    /// publisher reached this version first.
    fn commit(&self, asset: &Asset, local_file: &Path) -> Result<Option<Asset>> {
        self.repository.update_manifest(|manifest| {
            if let Some(latest) = manifest.latest_version(asset.asset_type, &asset.name) {
                if latest >= asset.version {
                    return Ok(None);
                }
            }

            let target = self.repository.asset_path(asset)?;
            copy_asset(local_file, &target)?;

            let mut published = asset.clone();
            published.status = AssetStatus::Published;
            published.source_path = target;
            manifest.add_asset(published.clone());
            Ok(Some(published))
        })
    }

    fn install_copy(&self, asset: &Asset) -> Result<PathBuf> {
        Asset::validate_name(&asset.name)?;
        let target = self.paths.install_dir.join(asset.file_name());
        copy_asset(&asset.source_path, &target)?;
        Ok(target)
    }

    /// Install one repository asset into the local install directory.
    ///
    /// Only the cached manifest is updated.
    pub fn install(&self, asset: &Asset, decisions: &mut dyn DecisionPort) -> Result<InstallOutcome> {
        let remote = self.repository.load_manifest();
        let mut record = remote
            .get_asset(asset.asset_type, &asset.name, asset.version)
            .cloned()
            .ok_or_else(|| TroveError::AssetNotFound(asset.to_string()))?;
        record.source_path = self.repository.asset_location(&record)?;

        let cache = self.cached_manifest();
        if cache.has_asset(record.asset_type, &record.name, record.version)
            && !decisions.reinstall(&record)?
        {
            tracing::info!(asset = %record, "install cancelled");
            return Ok(InstallOutcome::Aborted { asset: record });
        }

        let path = self.install_copy(&record)?;
        record.status = AssetStatus::Local;
        record.source_path = path.clone();

        let cached = record.clone();
        Manifest::update(&self.paths.cached_manifest, |m| {
            m.add_asset(cached);
            Ok(())
        })?;

        tracing::info!(asset = %record, path = %path.display(), "installed");
        Ok(InstallOutcome::Installed { asset: record, path })
    }
}

/// Copy one asset file, creating the destination folder.
///
/// Copying a file onto itself is refused rather than truncating it.
pub fn copy_asset(from: &Path, to: &Path) -> Result<()> {
    if to.exists() {
        if let (Ok(a), Ok(b)) = (fs::canonicalize(from), fs::canonicalize(to)) {
            if a == b {
                return Err(TroveError::SameFile(a));
            }
        }
    }

    let copy_err = |source| TroveError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(copy_err)?;
    }
    fs::copy(from, to).map_err(copy_err)?;
    tracing::debug!(from = %from.display(), to = %to.display(), "copied asset");
    Ok(())
}
