//! Deploy command - run a deployment flow against a workspace.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use owo_colors::OwoColorize;

use fabdeploy_core::{DeploymentFlow, EnvironmentMap, Settings};
use fabdeploy_flow::{DeploymentOutcome, FlowKind};

use crate::context::{AppContext, load_settings};
use crate::{Config, OutputFormat};

/// Workspace targeted when neither an environment nor `--workspace` is given.
pub const DEFAULT_WORKSPACE: &str = "Contoso";

/// Arguments for the deploy command.
#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Named environment from the environments file.
    #[arg()]
    pub environment: Option<String>,

    /// Workspace name (overrides the environment's workspace).
    #[arg(long, short = 'w')]
    pub workspace: Option<String>,

    /// Flow to run (hybrid, fabric, power-bi).
    #[arg(long)]
    pub flow: Option<DeploymentFlow>,

    /// Environments file.
    #[arg(long, default_value = "environments.yaml")]
    pub environments_file: PathBuf,

    /// Deadline for any single job, in seconds.
    #[arg(long)]
    pub job_timeout: Option<u64>,

    /// Do not open the workspace or the generated page.
    #[arg(long)]
    pub no_open: bool,
}

/// Workspace and flow a deployment targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Workspace name.
    pub workspace: String,
    /// Flow.
    pub flow: DeploymentFlow,
}

/// Resolves the target: explicit flags win over the environment entry,
/// which wins over the defaults.
///
/// # Errors
///
/// Returns an error if an environment is named but the file cannot be read
/// or does not define it.
pub fn resolve_target(args: &DeployArgs) -> Result<Target> {
    let environment = match &args.environment {
        Some(name) => Some(
            load_environments(&args.environments_file)?
                .resolve(name)
                .cloned()
                .with_context(|| format!("Environment '{name}' is not defined"))?,
        ),
        None => None,
    };

    let workspace = args
        .workspace
        .clone()
        .or_else(|| environment.as_ref().map(|e| e.workspace.clone()))
        .unwrap_or_else(|| DEFAULT_WORKSPACE.to_string());
    let flow = args
        .flow
        .or_else(|| environment.as_ref().and_then(|e| e.flow))
        .unwrap_or_default();
    Ok(Target { workspace, flow })
}

fn load_environments(path: &Path) -> Result<EnvironmentMap> {
    EnvironmentMap::load(path)
        .with_context(|| format!("Failed to load environments file: {}", path.display()))
}

fn apply_overrides(settings: &mut Settings, args: &DeployArgs) {
    if let Some(secs) = args.job_timeout {
        settings.polling.job_timeout_secs = secs;
    }
    if args.no_open {
        settings.interaction.open_browser = false;
    }
}

/// Execute the deploy command.
///
/// # Errors
///
/// Returns an error if settings are invalid, the target cannot be resolved,
/// or any deployment stage fails.
pub async fn execute(args: DeployArgs, config: &Config) -> Result<()> {
    let target = resolve_target(&args)?;
    let mut settings = load_settings(config)?;
    apply_overrides(&mut settings, &args);
    settings.validate().context("Invalid settings")?;

    let context = AppContext::connect(settings).await?;
    let result = context
        .orchestrator()
        .deploy(FlowKind::from(target.flow), &target.workspace)
        .await
        .with_context(|| {
            format!(
                "Deployment of flow {} to workspace '{}' failed",
                target.flow, target.workspace
            )
        });
    context.shutdown().await;

    print_outcome(&result?, config)
}

/// Prints a deployment outcome in the configured format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_outcome(outcome: &DeploymentOutcome, config: &Config) -> Result<()> {
    match config.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(outcome).context("Failed to serialize outcome")?
            );
        }
        OutputFormat::Text => {
            println!("{} {}", "Deployment finished:".green(), outcome.flow);
            println!();
            let workspace_state = if outcome.workspace_created {
                "created".green().to_string()
            } else {
                "reused".yellow().to_string()
            };
            println!(
                "  Workspace:  {} ({}) {workspace_state}",
                outcome.workspace.display_name, outcome.workspace.id
            );
            if let Some(report) = outcome.report_id {
                println!("  Report ID:  {report}");
            }
            if let Some(page) = &outcome.page_path {
                println!("  Page:       {}", page.display());
            }
            for (item_type, name) in &outcome.created {
                println!("  {} {item_type} {name}", "+".green());
            }
            for (item_type, name) in &outcome.reused {
                println!("  {} {item_type} {name}", "=".dimmed());
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct Row {
                #[tabled(rename = "Action")]
                action: &'static str,
                #[tabled(rename = "Type")]
                item_type: String,
                #[tabled(rename = "Name")]
                name: String,
            }

            let mut rows = vec![Row {
                action: if outcome.workspace_created {
                    "created"
                } else {
                    "reused"
                },
                item_type: "Workspace".to_string(),
                name: outcome.workspace.display_name.clone(),
            }];
            rows.extend(outcome.created.iter().map(|(t, n)| Row {
                action: "created",
                item_type: t.to_string(),
                name: n.clone(),
            }));
            rows.extend(outcome.reused.iter().map(|(t, n)| Row {
                action: "reused",
                item_type: t.to_string(),
                name: n.clone(),
            }));
            println!("{}", Table::new(rows));
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
        args: DeployArgs,
    }

    #[test]
    fn test_deploy_defaults() {
        let cli = TestCli::parse_from(["test"]);
        let target = resolve_target(&cli.args).unwrap();
        assert_eq!(target.workspace, "Contoso");
        assert_eq!(target.flow, DeploymentFlow::Hybrid);
    }

    #[test]
    fn test_deploy_args_with_flow() {
        let cli = TestCli::parse_from(["test", "--workspace", "Fabrikam", "--flow", "power-bi"]);
        let target = resolve_target(&cli.args).unwrap();
        assert_eq!(target.workspace, "Fabrikam");
        assert_eq!(target.flow, DeploymentFlow::PowerBi);
    }

    #[test]
    fn test_environment_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("environments.yaml");
        std::fs::write(
            &file,
            "dev:\n  workspace: Contoso Dev\n  flow: fabric\nprod:\n  workspace: Contoso\n",
        )
        .unwrap();
        let file_arg = file.to_string_lossy().to_string();

        let cli = TestCli::parse_from(["test", "dev", "--environments-file", &file_arg]);
        let target = resolve_target(&cli.args).unwrap();
        assert_eq!(target.workspace, "Contoso Dev");
        assert_eq!(target.flow, DeploymentFlow::Fabric);

        let cli = TestCli::parse_from([
            "test",
            "dev",
            "--environments-file",
            &file_arg,
            "--workspace",
            "Override",
        ]);
        assert_eq!(resolve_target(&cli.args).unwrap().workspace, "Override");

        let cli = TestCli::parse_from(["test", "staging", "--environments-file", &file_arg]);
        assert!(resolve_target(&cli.args).is_err());
    }

    #[test]
    fn test_overrides_apply_to_settings() {
        let cli = TestCli::parse_from(["test", "--job-timeout", "60", "--no-open"]);
        let mut settings = Settings::default();
        apply_overrides(&mut settings, &cli.args);
        assert_eq!(settings.polling.job_timeout_secs, 60);
        assert!(!settings.interaction.viewer_enabled());
    }
}
