pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::database::Database;

#[derive(Parser)]
#[command(name = "portal")]
#[command(about = "Client Portal admin CLI - migrations, plan catalog and usage inspection")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Plan catalog management")]
    Plans {
        #[command(subcommand)]
        cmd: commands::plans::PlanCommands,
    },

    #[command(about = "Operator subscription grants")]
    Subscriptions {
        #[command(subcommand)]
        cmd: commands::subscriptions::SubscriptionCommands,
    },

    #[command(about = "Inspect a freelancer's plan usage")]
    Usage {
        #[command(subcommand)]
        cmd: commands::usage::UsageCommands,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = config::config();
    let db = Database::connect(&config.database).await?;

    let result = match cli.command {
        Commands::Migrate => commands::migrate::handle(&db, output_format).await,
        Commands::Plans { cmd } => commands::plans::handle(cmd, &db, output_format).await,
        Commands::Subscriptions { cmd } => commands::subscriptions::handle(cmd, &db, output_format).await,
        Commands::Usage { cmd } => commands::usage::handle(cmd, &db, config, output_format).await,
    };

    db.close().await;
    result
}
