//! CLI command implementations

pub mod install;
pub mod publish;
pub mod scan;

use crate::config::TroveConfig;
use crate::prompt::{self, TerminalPrompt};
use trove_asset::{Asset, DecisionPort, Manifest, Repository, Session, Unattended};
use trove_core::{Result, TroveError, Version};

/// Load configuration and open the repository.
///
/// Every failure here is reported as [`TroveError::Config`] so it is fatal
/// before any command logic runs.
pub fn open_session() -> Result<Session> {
    let as_config = |e: TroveError| match e {
        TroveError::Config(_) => e,
        other => TroveError::Config(other.to_string()),
    };

    let config = TroveConfig::load()?;
    let repository = Repository::from_config(&config.repository).map_err(as_config)?;
    let paths = config.user.local_paths().map_err(as_config)?;
    tracing::debug!(
        repository = %repository.root().display(),
        nuke_dir = %paths.nuke_dir.display(),
        "opened session"
    );
    Ok(Session::new(repository, paths))
}

/// The decision port for questions not answered by a flag
pub fn interactive_or_unattended() -> Box<dyn DecisionPort> {
    if prompt::is_interactive() {
        Box::new(TerminalPrompt::stdin())
    } else {
        Box::new(Unattended)
    }
}

/// Pick one asset by name and version, or from a numbered menu
pub fn choose_asset(
    manifest: &Manifest,
    name: Option<&str>,
    version: Option<&str>,
    title: &str,
) -> Result<Asset> {
    let version = version.map(Version::parse).transpose()?;
    if let Some(name) = name {
        return manifest.lookup(None, name, version).cloned();
    }

    if !prompt::is_interactive() {
        return Err(TroveError::NoDecisionPolicy(
            "--asset is required when stdin is not a terminal".to_string(),
        ));
    }
    let assets: Vec<&Asset> = manifest
        .iter()
        .filter(|a| version.map_or(true, |v| a.version == v))
        .collect();
    TerminalPrompt::stdin().select(title, &assets).cloned()
}
