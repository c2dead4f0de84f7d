//! fabdeploy - provision analytics workspaces and embed their reports.
//!
//! The main entry point for the `fabdeploy` CLI binary.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use fabdeploy_cli::{Cli, Commands, Config};
use fabdeploy_core::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format.into());
    let config = cli.config();

    match run(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "fabdeploy failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, config: &Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match command {
            Commands::Deploy(args) => fabdeploy_cli::commands::deploy::execute(args, config).await,
            Commands::Embed(args) => fabdeploy_cli::commands::embed::execute(args, config).await,
            Commands::Workspaces => fabdeploy_cli::commands::workspaces::execute(config).await,
            Commands::Capacities => fabdeploy_cli::commands::capacities::execute(config).await,
            Commands::Profiles(args) => {
                fabdeploy_cli::commands::profiles::execute(args, config).await
            }
        }
    })
}
