//! `trove install`

use super::{choose_asset, interactive_or_unattended, open_session};
use crate::output::{print_manifest, OutputFormat};
use anyhow::Result;
use clap::Args;
use trove_asset::{ConflictPolicy, DecisionPort, InstallOutcome, Preset};
use trove_core::TroveError;

#[derive(Args)]
pub struct InstallArgs {
    /// Asset name (prompts with a menu when omitted)
    #[arg(long)]
    pub asset: Option<String>,

    /// Asset version (defaults to the latest published)
    #[arg(long)]
    pub version: Option<String>,

    /// Reinstall without asking when already installed
    #[arg(long, short)]
    pub yes: bool,
}

pub fn run(args: InstallArgs) -> Result<()> {
    let session = open_session()?;
    let remote = session.remote_view();

    if args.asset.is_none() {
        print_manifest(&remote, OutputFormat::Table)?;
    }
    let asset = choose_asset(
        &remote,
        args.asset.as_deref(),
        args.version.as_deref(),
        "Published assets:",
    )?;

    let mut decisions: Box<dyn DecisionPort> = if args.yes {
        Box::new(Preset::new(ConflictPolicy::Abort).with_reinstall(true))
    } else {
        interactive_or_unattended()
    };

    match session.install(&asset, decisions.as_mut())? {
        InstallOutcome::Installed { asset, path } => {
            println!("Installed {} to {}", asset, path.display());
            Ok(())
        }
        InstallOutcome::Aborted { asset } => {
            Err(TroveError::Aborted(format!("{} is already installed", asset)).into())
        }
    }
}
