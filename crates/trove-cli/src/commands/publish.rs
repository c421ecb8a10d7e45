//! `trove publish`

use super::{choose_asset, interactive_or_unattended, open_session};
use crate::output::{print_manifest, OutputFormat};
use crate::prompt::{self, TerminalPrompt};
use anyhow::{Context, Result};
use clap::Args;
use trove_asset::{ConflictPolicy, DecisionPort, Preset, PublishOutcome};
use trove_core::{TroveError, VersionField};

#[derive(Args)]
pub struct PublishArgs {
    /// Scan the current directory instead of the configured Nuke directory
    #[arg(long)]
    pub local: bool,

    /// Asset name (prompts with a menu when omitted)
    #[arg(long)]
    pub asset: Option<String>,

    /// Asset version (defaults to the latest found)
    #[arg(long)]
    pub version: Option<String>,

    /// Publish message
    #[arg(long, short)]
    pub message: Option<String>,

    /// On a version conflict, bump this field without asking
    #[arg(long, value_parser = parse_field, conflicts_with = "abort_on_conflict")]
    pub bump: Option<VersionField>,

    /// On a version conflict, cancel without asking
    #[arg(long)]
    pub abort_on_conflict: bool,
}

fn parse_field(s: &str) -> std::result::Result<VersionField, String> {
    s.parse()
}

pub fn run(args: PublishArgs) -> Result<()> {
    let session = open_session()?;

    let scan_root = if args.local {
        std::env::current_dir().context("cannot read the current directory")?
    } else {
        session.paths().nuke_dir.clone()
    };
    let view = session
        .local_view(&scan_root)
        .with_context(|| format!("failed to scan {}", scan_root.display()))?;
    for skipped in &view.skipped {
        eprintln!("Skipped {}: {}", skipped.path.display(), skipped.error);
    }

    if args.asset.is_none() {
        print_manifest(&view.manifest, OutputFormat::Table)?;
    }
    let mut asset = choose_asset(
        &view.manifest,
        args.asset.as_deref(),
        args.version.as_deref(),
        "Assets available to publish:",
    )?;

    asset.message = match args.message {
        Some(message) => Some(message),
        None if prompt::is_interactive() => {
            Some(TerminalPrompt::stdin().ask(&format!("Message for {}", asset))?)
        }
        None => None,
    };

    let mut decisions: Box<dyn DecisionPort> = match (args.bump, args.abort_on_conflict) {
        (Some(field), _) => Box::new(Preset::new(ConflictPolicy::Bump(field))),
        (None, true) => Box::new(Preset::new(ConflictPolicy::Abort)),
        (None, false) => interactive_or_unattended(),
    };

    match session.publish(asset, decisions.as_mut())? {
        PublishOutcome::Published {
            asset,
            installed_to,
        } => {
            println!("Published {} to {}", asset, asset.source_path.display());
            if let Some(path) = installed_to {
                println!("  Installed: {}", path.display());
            }
            Ok(())
        }
        PublishOutcome::Aborted { asset, reason } => {
            Err(TroveError::Aborted(reason.message(&asset)).into())
        }
    }
}
