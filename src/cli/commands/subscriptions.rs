use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::{plans, users, Database};
use crate::types::Role;

#[derive(Subcommand)]
pub enum SubscriptionCommands {
    #[command(about = "Put a freelancer on a plan, replacing any active subscription")]
    Grant {
        #[arg(long, help = "Freelancer user ID")]
        user: Uuid,
        #[arg(long, help = "Plan name")]
        plan: String,
        #[arg(long, default_value_t = 30, help = "Length of the subscription in days")]
        days: i64,
    },
}

pub async fn handle(cmd: SubscriptionCommands, db: &Database, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SubscriptionCommands::Grant { user, plan, days } => {
            if days <= 0 {
                anyhow::bail!("--days must be positive");
            }

            let mut tx = db.pool().begin().await?;

            let role = users::find_role(&mut *tx, user)
                .await?
                .with_context(|| format!("user {} not found", user))?;
            if role != Role::Freelancer {
                anyhow::bail!("user {} is a {}, only freelancers hold subscriptions", user, role);
            }

            let plan = plans::find_by_name(&mut *tx, &plan)
                .await?
                .with_context(|| format!("plan '{}' not found", plan))?;

            let starts_at = Utc::now();
            let ends_at = starts_at + Duration::days(days);
            let subscription = plans::grant_subscription(&mut tx, user, plan.id, starts_at, ends_at).await?;
            tx.commit().await?;

            output_success(
                &output_format,
                &format!("Granted {} to {} until {}", plan.name, user, ends_at.format("%Y-%m-%d %H:%M")),
                Some(json!({ "subscription": subscription })),
            )
        }
    }
}
