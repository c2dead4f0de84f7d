//! Profiles command - list or create service principal profiles.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::context::{AppContext, load_settings};
use crate::{Config, OutputFormat};

/// Arguments for the profiles command.
#[derive(Debug, Args)]
pub struct ProfilesArgs {
    /// Profile action.
    #[command(subcommand)]
    pub action: ProfileAction,
}

/// Profile actions.
#[derive(Debug, Subcommand)]
pub enum ProfileAction {
    /// List profiles.
    List,
    /// Create a profile.
    Create {
        /// Display name of the new profile.
        name: String,
    },
}

/// Execute the profiles command.
///
/// # Errors
///
/// Returns an error if settings are invalid or the remote call fails.
pub async fn execute(args: ProfilesArgs, config: &Config) -> Result<()> {
    let settings = load_settings(config)?;
    settings.validate_credentials().context("Invalid settings")?;

    let context = AppContext::connect(settings).await?;
    let result = match &args.action {
        ProfileAction::List => context
            .client()
            .list_profiles()
            .await
            .context("Failed to list profiles"),
        ProfileAction::Create { name } => context
            .client()
            .create_profile(name)
            .await
            .map(|profile| vec![profile])
            .with_context(|| format!("Failed to create profile '{name}'")),
    };
    context.shutdown().await;
    let profiles = result?;

    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&profiles)?);
        }
        OutputFormat::Text | OutputFormat::Table => {
            if profiles.is_empty() {
                println!("No profiles found");
            }
            for profile in &profiles {
                println!("  {} {}", profile.id, profile.display_name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ProfilesArgs,
    }

    #[test]
    fn test_profiles_create_parsing() {
        let cli = TestCli::parse_from(["test", "create", "Contoso Embedding"]);
        assert!(matches!(
            cli.args.action,
            ProfileAction::Create { ref name } if name == "Contoso Embedding"
        ));
    }

    #[test]
    fn test_profiles_list_parsing() {
        let cli = TestCli::parse_from(["test", "list"]);
        assert!(matches!(cli.args.action, ProfileAction::List));
    }
}
