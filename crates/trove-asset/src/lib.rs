//! Trove Asset - versioned asset publishing for Nuke
//!
//! This crate provides the asset model, JSON manifests, the shared central
//! repository, directory scanning, version conflict resolution and the
//! publish/install workflow built on top of them.

mod lock;
mod manifest;
mod reconcile;
mod repository;
mod resolver;
mod scanner;
mod types;
mod workflow;

pub use lock::{atomic_write, ManifestLock};
pub use manifest::Manifest;
pub use reconcile::{reconcile_install, reconcile_publish, Drift, DriftEntry, DriftReport};
pub use repository::{expand_path, Repository, RepositoryConfig, MANIFEST_FILE};
pub use resolver::{
    AbortReason, Answer, ConflictPolicy, DecisionPort, Preset, Resolution, ScriptedDecisions,
    Unattended, VersionResolver,
};
pub use scanner::{scan, scan_directory, ScanReport, SkippedFile};
pub use types::{Asset, AssetStatus, AssetType, ParsedAsset};
pub use workflow::{
    copy_asset, InstallOutcome, LocalPaths, LocalView, PublishOutcome, Session,
    CACHED_MANIFEST_FILE,
};
