//! Workspaces command - list shared workspaces.

use anyhow::{Context, Result};

use crate::context::{AppContext, load_settings};
use crate::{Config, OutputFormat};

/// Execute the workspaces command.
///
/// # Errors
///
/// Returns an error if settings are invalid or the listing fails.
pub async fn execute(config: &Config) -> Result<()> {
    let settings = load_settings(config)?;
    settings.validate_credentials().context("Invalid settings")?;

    let context = AppContext::connect(settings).await?;
    let result = context
        .client()
        .list_workspaces()
        .await
        .context("Failed to list workspaces");
    context.shutdown().await;
    let workspaces = result?;

    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&workspaces)?);
        }
        OutputFormat::Text => {
            if workspaces.is_empty() {
                println!("No workspaces found");
                return Ok(());
            }
            for workspace in &workspaces {
                let capacity = workspace
                    .capacity_id
                    .map_or_else(|| "no capacity".to_string(), |c| format!("capacity {c}"));
                println!("  {} {} ({capacity})", workspace.id, workspace.display_name);
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct WorkspaceRow {
                #[tabled(rename = "ID")]
                id: String,
                #[tabled(rename = "Name")]
                name: String,
                #[tabled(rename = "Capacity")]
                capacity: String,
            }

            let rows: Vec<_> = workspaces
                .iter()
                .map(|w| WorkspaceRow {
                    id: w.id.to_string(),
                    name: w.display_name.clone(),
                    capacity: w.capacity_id.map(|c| c.to_string()).unwrap_or_default(),
                })
                .collect();
            if rows.is_empty() {
                println!("No workspaces found");
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }
    Ok(())
}
