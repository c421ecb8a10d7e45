//! Trove CLI - publish, install and inspect versioned Nuke assets

mod commands;
mod config;
mod output;
mod prompt;

use clap::{Parser, Subcommand};
use commands::{install, publish, scan};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use trove_core::TroveError;

#[derive(Parser)]
#[command(name = "trove")]
#[command(about = "Version manager for Nuke gizmos and scripts", long_about = None)]
#[command(version)]
struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a local asset to the central repository
    Publish(publish::PublishArgs),

    /// Install a published asset locally
    Install(install::InstallArgs),

    /// List local or published assets
    Scan(scan::ScanArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("TROVE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 0 for success or cancel, 2 for configuration problems, 1 otherwise
fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<TroveError>() {
        Some(TroveError::Config(_)) => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Publish(args) => publish::run(args),
        Commands::Install(args) => install::run(args),
        Commands::Scan(args) => scan::run(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<TroveError>() {
            Some(TroveError::Aborted(reason)) => {
                println!("cancelled: {}", reason);
                ExitCode::SUCCESS
            }
            _ => {
                eprintln!("Error: {:#}", err);
                exit_code(&err)
            }
        },
    }
}
