//! `trove scan`

use super::open_session;
use crate::output::{print_manifest, OutputFormat};
use anyhow::Result;
use clap::{Args, ValueEnum};
use trove_asset::Drift;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ScanTarget {
    /// The configured Nuke directory, enriched from the local cache
    #[default]
    Local,
    /// The central repository manifest
    Remote,
}

#[derive(Args)]
pub struct ScanArgs {
    /// What to scan
    #[arg(value_enum, default_value_t = ScanTarget::Local)]
    pub target: ScanTarget,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

pub fn run(args: ScanArgs) -> Result<()> {
    let session = open_session()?;

    match args.target {
        ScanTarget::Local => {
            let view = session.local_view(&session.paths().nuke_dir)?;
            print_manifest(&view.manifest, args.format)?;
            if args.format == OutputFormat::Table {
                for entry in view.drift.outdated() {
                    if let Drift::Outdated { latest } = entry.drift {
                        println!(
                            "note: {}_v{} is behind the published {}",
                            entry.name, entry.version, latest
                        );
                    }
                }
                if !view.skipped.is_empty() {
                    println!("{} file(s) skipped, run with -v for details", view.skipped.len());
                }
            }
        }
        ScanTarget::Remote => print_manifest(&session.remote_view(), args.format)?,
    }
    Ok(())
}
