//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. `TROVE_CONFIG`: path to an explicit config file
//! 2. Project-local: `.trove/config.toml`
//! 3. Global: `~/.trove/config.toml`

use serde::Deserialize;
use std::path::{Path, PathBuf};
use trove_asset::{expand_path, AssetType, LocalPaths, RepositoryConfig};
use trove_core::{Result, TroveError};

const CONFIG_ENV: &str = "TROVE_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
struct RepositoryLayer {
    #[serde(default)]
    root: Option<String>,
    #[serde(default)]
    subfolder: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct UserLayer {
    #[serde(default)]
    nuke_dir: Option<String>,
    #[serde(default)]
    state_dir: Option<String>,
    #[serde(default)]
    install_dir: Option<String>,
}

/// One config file; every key is optional until the layers are merged
#[derive(Debug, Clone, Default, Deserialize)]
struct TroveConfigFile {
    #[serde(default)]
    repository: RepositoryLayer,
    #[serde(default)]
    user: UserLayer,
}

/// `[user]` section after layering
#[derive(Debug, Clone)]
pub struct UserConfig {
    pub nuke_dir: String,
    pub state_dir: Option<String>,
    pub install_dir: Option<String>,
}

impl UserConfig {
    /// Expand the configured paths; `state_dir` defaults to `~/.trove` and
    /// `install_dir` to `<nuke_dir>/trove`.
    pub fn local_paths(&self) -> Result<LocalPaths> {
        let expand = |key: &str, raw: &str| {
            expand_path(raw).map_err(|e| TroveError::Config(format!("user.{}: {}", key, e)))
        };

        let nuke_dir = expand("nuke_dir", &self.nuke_dir)?;
        let state_dir = match &self.state_dir {
            Some(raw) => expand("state_dir", raw)?,
            None => expand("state_dir", "~/.trove")?,
        };
        let install_dir = match &self.install_dir {
            Some(raw) => expand("install_dir", raw)?,
            None => nuke_dir.join("trove"),
        };
        Ok(LocalPaths::new(nuke_dir, install_dir, state_dir))
    }
}

/// Resolved configuration
#[derive(Debug, Clone)]
pub struct TroveConfig {
    pub repository: RepositoryConfig,
    pub user: UserConfig,
}

impl TroveConfig {
    /// Load config with layered precedence: global < project < `TROVE_CONFIG`
    pub fn load() -> Result<Self> {
        let mut config = TroveConfigFile::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                Self::merge_into(&mut config, Self::load_file(&global_path)?);
            }
        }

        let local_path = PathBuf::from(".trove/config.toml");
        if local_path.exists() {
            Self::merge_into(&mut config, Self::load_file(&local_path)?);
        }

        if let Some(explicit) = std::env::var_os(CONFIG_ENV) {
            let path = PathBuf::from(explicit);
            if !path.is_file() {
                return Err(TroveError::Config(format!(
                    "{} points to {}, which does not exist",
                    CONFIG_ENV,
                    path.display()
                )));
            }
            Self::merge_into(&mut config, Self::load_file(&path)?);
        }

        Self::resolve(config)
    }

    /// Load config from a specific file path only
    #[cfg(test)]
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::resolve(Self::load_file(path)?)
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".trove").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<TroveConfigFile> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TroveError::Config(format!("failed to read config {}: {}", path.display(), e))
        })?;
        let config: TroveConfigFile = toml::from_str(&content).map_err(|e| {
            TroveError::Config(format!("failed to parse config {}: {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded config layer");
        Ok(config)
    }

    fn merge_into(base: &mut TroveConfigFile, overlay: TroveConfigFile) {
        if overlay.repository.root.is_some() {
            base.repository.root = overlay.repository.root;
        }
        if overlay.repository.subfolder.is_some() {
            base.repository.subfolder = overlay.repository.subfolder;
        }
        if overlay.user.nuke_dir.is_some() {
            base.user.nuke_dir = overlay.user.nuke_dir;
        }
        if overlay.user.state_dir.is_some() {
            base.user.state_dir = overlay.user.state_dir;
        }
        if overlay.user.install_dir.is_some() {
            base.user.install_dir = overlay.user.install_dir;
        }
    }

    fn resolve(file: TroveConfigFile) -> Result<Self> {
        let missing = |key: &str| TroveError::Config(format!("missing required key {}", key));

        let root = file.repository.root.ok_or_else(|| missing("repository.root"))?;
        let subfolder = file
            .repository
            .subfolder
            .unwrap_or_else(|| AssetType::ALL.iter().map(|t| t.to_string()).collect());
        let nuke_dir = file.user.nuke_dir.ok_or_else(|| missing("user.nuke_dir"))?;

        Ok(TroveConfig {
            repository: RepositoryConfig { root, subfolder },
            user: UserConfig {
                nuke_dir,
                state_dir: file.user.state_dir,
                install_dir: file.user.install_dir,
            },
        })
    }
}
