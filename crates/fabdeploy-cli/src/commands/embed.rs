//! Embed command - generate the embedding page for an existing report.

use anyhow::{Context, Result};
use clap::Args;

use fabdeploy_flow::orchestrator::Blueprint;

use crate::Config;
use crate::commands::deploy::print_outcome;
use crate::context::{AppContext, load_settings};

/// Arguments for the embed command.
#[derive(Debug, Args)]
pub struct EmbedArgs {
    /// Workspace holding the report.
    #[arg(long, short = 'w')]
    pub workspace: String,

    /// Report name (defaults to the report the deploy flows create).
    #[arg(long, short = 'r')]
    pub report: Option<String>,
}

/// Execute the embed command.
///
/// # Errors
///
/// Returns an error if the workspace or report does not exist, or the page
/// cannot be generated.
pub async fn execute(args: EmbedArgs, config: &Config) -> Result<()> {
    let settings = load_settings(config)?;
    settings.validate_credentials().context("Invalid settings")?;
    let report = args.report.unwrap_or_else(|| Blueprint::default().report);

    let context = AppContext::connect(settings).await?;
    let result = context
        .orchestrator()
        .embed(&args.workspace, &report)
        .await
        .with_context(|| {
            format!(
                "Failed to embed report '{report}' from workspace '{}'",
                args.workspace
            )
        });
    context.shutdown().await;

    print_outcome(&result?, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: EmbedArgs,
    }

    #[test]
    fn test_embed_args_parsing() {
        let cli = TestCli::parse_from(["test", "--workspace", "Contoso"]);
        assert_eq!(cli.args.workspace, "Contoso");
        assert!(cli.args.report.is_none());

        let cli = TestCli::parse_from(["test", "-w", "Contoso", "-r", "Sales"]);
        assert_eq!(cli.args.report.as_deref(), Some("Sales"));
    }
}
