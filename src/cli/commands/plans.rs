use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::{plans, Database};

#[derive(Subcommand)]
pub enum PlanCommands {
    #[command(about = "List plans ordered by price")]
    List,

    #[command(about = "Create or update plans from a YAML catalog")]
    Import {
        #[arg(help = "Path to the YAML catalog")]
        file: PathBuf,
    },
}

/// One entry of a YAML plan catalog. A missing or null limit is unlimited.
#[derive(Debug, Deserialize)]
pub struct PlanEntry {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub max_clients: Option<i32>,
    #[serde(default)]
    pub max_storage_mb: Option<i32>,
    #[serde(default)]
    pub max_team: Option<i32>,
}

pub fn parse_catalog(yaml: &str) -> anyhow::Result<Vec<PlanEntry>> {
    let entries: Vec<PlanEntry> = serde_yaml::from_str(yaml).context("invalid plan catalog")?;

    for entry in &entries {
        if entry.name.trim().is_empty() {
            anyhow::bail!("plan name cannot be empty");
        }
        if entry.price.is_sign_negative() {
            anyhow::bail!("plan '{}' has a negative price", entry.name);
        }
    }

    Ok(entries)
}

pub async fn handle(cmd: PlanCommands, db: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PlanCommands::List => {
            let plans = plans::list(db.pool()).await?;

            if plans.is_empty() {
                return output_empty_collection(&output_format, "plans", "No plans configured");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "plans": plans }))?,
                OutputFormat::Text => {
                    println!("{:<15} {:>10} {:>12} {:>14} {:>10}", "NAME", "PRICE", "CLIENTS", "STORAGE (MB)", "TEAM");
                    println!("{}", "-".repeat(65));

                    for plan in &plans {
                        println!(
                            "{:<15} {:>10} {:>12} {:>14} {:>10}",
                            plan.name,
                            plan.price,
                            format_limit(plan.max_clients),
                            format_limit(plan.max_storage_mb),
                            format_limit(plan.max_team)
                        );
                    }
                }
            }

            Ok(())
        }
        PlanCommands::Import { file } => {
            let yaml = std::fs::read_to_string(&file).with_context(|| format!("cannot read {}", file.display()))?;
            let entries = parse_catalog(&yaml)?;

            let mut tx = db.pool().begin().await?;
            let mut names = Vec::with_capacity(entries.len());
            for entry in &entries {
                let plan = plans::upsert(
                    &mut *tx,
                    entry.name.trim(),
                    entry.price,
                    entry.max_clients,
                    entry.max_storage_mb,
                    entry.max_team,
                )
                .await?;
                names.push(plan.name);
            }
            tx.commit().await?;

            output_success(
                &output_format,
                &format!("Imported {} plan(s): {}", names.len(), names.join(", ")),
                Some(json!({ "plans": names })),
            )
        }
    }
}
