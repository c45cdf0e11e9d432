use clap::Subcommand;
use uuid::Uuid;

use crate::cli::utils::output_json;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::{Database, PgUsageStore};
use crate::services::UsageService;
use crate::usage::upgrade::UpgradeRecommendation;
use crate::usage::{OverLimitReport, UsageReport};

#[derive(Subcommand)]
pub enum UsageCommands {
    #[command(about = "Plan in effect and usage against its limits")]
    Show {
        #[arg(help = "Freelancer user ID")]
        user: Uuid,
    },

    #[command(about = "Which limits the user currently exceeds")]
    OverLimit {
        #[arg(help = "User ID")]
        user: Uuid,
    },

    #[command(about = "Cheapest plan that fits current usage")]
    Upgrade {
        #[arg(help = "Freelancer user ID")]
        user: Uuid,
    },
}

pub async fn handle(
    cmd: UsageCommands,
    db: &Database,
    config: &AppConfig,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let mut conn = db.acquire().await?;
    let mut usage = UsageService::new(PgUsageStore::new(&mut conn), config.plans.clone());

    match cmd {
        UsageCommands::Show { user } => {
            let report = usage.usage_report(user).await?;
            match output_format {
                OutputFormat::Json => output_json(&report),
                OutputFormat::Text => {
                    print_report(&report);
                    Ok(())
                }
            }
        }
        UsageCommands::OverLimit { user } => {
            let report = usage.over_limit(user).await?;
            match output_format {
                OutputFormat::Json => output_json(&report),
                OutputFormat::Text => {
                    print_over_limit(&report);
                    Ok(())
                }
            }
        }
        UsageCommands::Upgrade { user } => {
            let recommendation = usage.upgrade_recommendation(user).await?;
            match output_format {
                OutputFormat::Json => output_json(&recommendation),
                OutputFormat::Text => {
                    print_recommendation(&recommendation);
                    Ok(())
                }
            }
        }
    }
}

fn print_report(report: &UsageReport) {
    let plan = &report.plan;
    let source = if plan.is_active { "subscription" } else { "free fallback" };
    println!("Plan: {} ({})", plan.name, source);
    if let Some(ends_at) = plan.ends_at {
        println!("Ends: {}", ends_at.format("%Y-%m-%d %H:%M"));
    }
    println!();
    println!("{:<10} {:>14} {:>12} {:>6} {}", "METRIC", "CURRENT", "LIMIT", "USED", "");
    println!("{}", "-".repeat(52));

    let usage = &report.usage;
    println!(
        "{:<10} {:>14} {:>12} {:>5}% {}",
        "clients",
        usage.clients.current,
        usage.clients.limit.to_string(),
        usage.clients.usage_percentage,
        over_marker(usage.clients.is_over_limit)
    );
    println!(
        "{:<10} {:>14} {:>12} {:>5}% {}",
        "storage",
        format!("{} MB", usage.storage.current),
        usage.storage.limit.to_string(),
        usage.storage.usage_percentage,
        over_marker(usage.storage.is_over_limit)
    );
    println!(
        "{:<10} {:>14} {:>12} {:>5}% {}",
        "team",
        usage.team.current,
        usage.team.limit.to_string(),
        usage.team.usage_percentage,
        over_marker(usage.team.is_over_limit)
    );
}

fn over_marker(over: bool) -> &'static str {
    if over {
        "OVER"
    } else {
        ""
    }
}

fn print_over_limit(report: &OverLimitReport) {
    if report.is_over_limit {
        println!("{}", report.message);
    } else {
        println!("Within plan limits");
    }
}

fn print_recommendation(recommendation: &UpgradeRecommendation) {
    println!("Current plan: {}", recommendation.current_plan);
    if let Some(plan) = &recommendation.recommended_plan {
        println!("Recommended: {} ({})", plan.name, plan.price);
    }
    println!("{}", recommendation.message);
}
