//! # fabdeploy-cli
//!
//! Command-line interface for fabdeploy.
//!
//! ## Commands
//!
//! - `fabdeploy deploy` - Run a deployment flow against a workspace
//! - `fabdeploy embed` - Generate the embedding page for an existing report
//! - `fabdeploy workspaces` - List workspaces
//! - `fabdeploy capacities` - List capacities
//! - `fabdeploy profiles` - List or create service principal profiles
//!
//! ## Configuration
//!
//! Settings come from an optional YAML file, `FABDEPLOY_*` environment
//! variables and a secrets directory:
//!
//! - `FABDEPLOY_CONFIG` - YAML settings file
//! - `FABDEPLOY_SECRETS_DIR` - one file per secret
//! - `FABDEPLOY_CAPACITY_ID` - capacity new workspaces are assigned to
//! - `FABDEPLOY_AUTH_MODE` - `service_principal` or `user`

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
// CLI uses print! macros intentionally
#![allow(clippy::print_stdout)]
#![allow(clippy::print_stderr)]

pub mod commands;
pub mod context;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use fabdeploy_core::LogFormat;

/// fabdeploy - provision analytics workspaces and embed their reports.
#[derive(Debug, Parser)]
#[command(name = "fabdeploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML settings file.
    #[arg(long, global = true, env = "FABDEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding one file per secret.
    #[arg(long, global = true, env = "FABDEPLOY_SECRETS_DIR")]
    pub secrets_dir: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Log format.
    #[arg(long, global = true, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Never open a viewer or prompt.
    #[arg(long, global = true)]
    pub non_interactive: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Get the effective configuration.
    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            config_file: self.config.clone(),
            secrets_dir: self.secrets_dir.clone(),
            format: self.format.clone(),
            non_interactive: self.non_interactive,
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a deployment flow.
    Deploy(commands::deploy::DeployArgs),
    /// Generate the embedding page for an existing report.
    Embed(commands::embed::EmbedArgs),
    /// List workspaces.
    Workspaces,
    /// List capacities.
    Capacities,
    /// Manage service principal profiles.
    Profiles(commands::profiles::ProfilesArgs),
}

/// Output format.
#[derive(Debug, Clone, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output.
    Json,
    /// Table output.
    Table,
}

/// Log format.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum LogFormatArg {
    /// Human-readable logs.
    #[default]
    Pretty,
    /// JSON structured logs.
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// YAML settings file.
    pub config_file: Option<PathBuf>,
    /// Secrets directory.
    pub secrets_dir: Option<PathBuf>,
    /// Output format.
    pub format: OutputFormat,
    /// Batch mode.
    pub non_interactive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_config_from_flags() {
        let cli = Cli::parse_from([
            "fabdeploy",
            "--config",
            "fabdeploy.yaml",
            "--secrets-dir",
            "/run/secrets",
            "--format",
            "json",
            "--non-interactive",
            "workspaces",
        ]);

        let config = cli.config();
        assert_eq!(config.config_file, Some(PathBuf::from("fabdeploy.yaml")));
        assert_eq!(config.secrets_dir, Some(PathBuf::from("/run/secrets")));
        assert!(matches!(config.format, OutputFormat::Json));
        assert!(config.non_interactive);
        assert!(matches!(cli.command, Commands::Workspaces));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["fabdeploy", "capacities", "--format", "table", "--log-format", "json"]);
        assert!(matches!(cli.format, OutputFormat::Table));
        assert!(matches!(LogFormat::from(cli.log_format), LogFormat::Json));
    }
}
