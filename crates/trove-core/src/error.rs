//! Error types for Trove

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Trove operations
#[derive(Debug, Error)]
pub enum TroveError {
    #[error("Invalid version '{0}': expected MAJOR.MINOR.PATCH")]
    InvalidVersion(String),

    #[error("Cannot pick the highest version of an empty set")]
    EmptyVersionSet,

    #[error("Version {version} cannot be bumped further on {field}")]
    VersionOverflow { version: String, field: String },

    #[error("Invalid asset name '{0}': names must be non-empty without '/', '\\' or '..'")]
    InvalidAssetName(String),

    #[error("Unsupported asset type for {0}: expected a .gizmo or .nk file")]
    UnsupportedAssetType(String),

    #[error("Asset type {0} is not declared by this repository")]
    UnknownAssetType(String),

    #[error("Invalid repository root {path}: {reason}")]
    InvalidRepositoryRoot { path: String, reason: String },

    #[error("{0} has no message; a changelog message is required before publishing")]
    MissingMessage(String),

    #[error("Cancelled: {0}")]
    Aborted(String),

    #[error("No decision policy for a non-interactive run: {0}")]
    NoDecisionPolicy(String),

    #[error("Failed to copy {} to {}: {source}", from.display(), to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source and destination are the same file: {}", .0.display())]
    SameFile(PathBuf),

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TroveError {
    /// True for user-driven cancellations, which are not failures
    pub fn is_aborted(&self) -> bool {
        matches!(self, TroveError::Aborted(_))
    }
}

/// Result type alias for Trove operations
pub type Result<T> = std::result::Result<T, TroveError>;
