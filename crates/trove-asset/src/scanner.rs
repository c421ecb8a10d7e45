//! Discover asset files on disk and build a transient manifest

use crate::manifest::Manifest;
use crate::types::{Asset, AssetType};
use std::path::{Path, PathBuf};
use trove_core::{Result, TroveError};
use walkdir::WalkDir;

/// A file that looked like an asset but could not be parsed
#[derive(Debug)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: TroveError,
}

/// Everything a scan found, plus what it had to step over
#[derive(Debug, Default)]
pub struct ScanReport {
    pub manifest: Manifest,
    /// Files with a known suffix whose name did not parse
    pub skipped: Vec<SkippedFile>,
    /// Files that resolved to a key already claimed earlier in the walk
    pub collisions: Vec<PathBuf>,
    /// Files without a `_v` suffix, recorded at `0.0.0`
    pub unversioned: Vec<PathBuf>,
}

/// Recursively scan `dir` for asset files.
///
/// Traversal is sorted by file name so results are stable. Unparseable files
/// are skipped and logged rather than failing the scan; when two files map to
/// the same `(type, name, version)` the later one wins.
pub fn scan_directory<P: AsRef<Path>>(dir: P) -> Result<ScanReport> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(TroveError::NotADirectory(dir.to_path_buf()));
    }

    let mut report = ScanReport::default();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during scan");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let known_suffix = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(AssetType::from_suffix)
            .is_some();
        if !known_suffix {
            continue;
        }

        let parsed = match Asset::parse_path(path) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "skipping asset file");
                report.skipped.push(SkippedFile {
                    path: path.to_path_buf(),
                    error,
                });
                continue;
            }
        };

        if parsed.unversioned {
            tracing::warn!(
                path = %path.display(),
                "no version in file name, treating as unversioned draft 0.0.0"
            );
            report.unversioned.push(path.to_path_buf());
        }

        let asset = parsed.asset;
        if let Some(previous) = report
            .manifest
            .get_asset(asset.asset_type, &asset.name, asset.version)
        {
            tracing::warn!(
                asset = %asset,
                kept = %path.display(),
                replaced = %previous.source_path.display(),
                "two files resolve to the same asset"
            );
            report.collisions.push(path.to_path_buf());
        }
        report.manifest.add_asset(asset);
    }

    tracing::debug!(
        dir = %dir.display(),
        assets = report.manifest.len(),
        skipped = report.skipped.len(),
        "scan finished"
    );
    Ok(report)
}

/// Scan `dir` and return only the resulting manifest
pub fn scan<P: AsRef<Path>>(dir: P) -> Result<Manifest> {
    scan_directory(dir).map(|report| report.manifest)
}
