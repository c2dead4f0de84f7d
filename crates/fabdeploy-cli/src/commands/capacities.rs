//! Capacities command - list capacities visible to the provisioning identity.

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use fabdeploy_client::model::Capacity;

use crate::context::{AppContext, load_settings};
use crate::{Config, OutputFormat};

/// Execute the capacities command.
///
/// # Errors
///
/// Returns an error if settings are invalid or the listing fails.
pub async fn execute(config: &Config) -> Result<()> {
    let settings = load_settings(config)?;
    settings.validate_credentials().context("Invalid settings")?;
    let configured = settings.capacity_id;

    let context = AppContext::connect(settings).await?;
    let result = context
        .client()
        .list_capacities()
        .await
        .context("Failed to list capacities");
    context.shutdown().await;
    let capacities = result?;

    match config.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&capacities)?);
        }
        OutputFormat::Text => {
            if capacities.is_empty() {
                println!("No capacities found");
                return Ok(());
            }
            for capacity in &capacities {
                let marker = if Some(capacity.id) == configured {
                    "*".green().to_string()
                } else {
                    " ".to_string()
                };
                println!(
                    " {marker} {} {} {}",
                    capacity.id,
                    capacity.display_name,
                    format_sku(capacity)
                );
            }
        }
        OutputFormat::Table => {
            use tabled::{Table, Tabled};

            #[derive(Tabled)]
            struct CapacityRow {
                #[tabled(rename = "ID")]
                id: String,
                #[tabled(rename = "Name")]
                name: String,
                #[tabled(rename = "SKU")]
                sku: String,
                #[tabled(rename = "Region")]
                region: String,
                #[tabled(rename = "State")]
                state: String,
            }

            let rows: Vec<_> = capacities
                .iter()
                .map(|c| CapacityRow {
                    id: c.id.to_string(),
                    name: c.display_name.clone(),
                    sku: c.sku.clone(),
                    region: c.region.clone().unwrap_or_default(),
                    state: c.state.clone().unwrap_or_default(),
                })
                .collect();
            if rows.is_empty() {
                println!("No capacities found");
            } else {
                println!("{}", Table::new(rows));
            }
        }
    }
    Ok(())
}

fn format_sku(capacity: &Capacity) -> String {
    if capacity.is_trial() {
        format!("{} (trial)", capacity.sku).yellow().to_string()
    } else {
        capacity.sku.clone()
    }
}
