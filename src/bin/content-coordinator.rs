//! # Content Coordinator CLI
//!
//! Validates configuration and runs one-off coordinated fetches against the
//! configured store, lock and generator backends.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use content_coordinator::config::CoordinatorSettings;
use content_coordinator::logging::init_structured_logging;
use content_coordinator::build_coordinator;
use std::path::PathBuf;
use std::process;
use tracing::error;

#[derive(Parser)]
#[command(name = "content-coordinator")]
#[command(about = "Single-flight generation of daily content")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Configuration file (TOML); CONTENT__* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate configuration, printing it with secrets redacted
    Validate,

    /// Fetch (generating if needed) the record for a category and date
    Fetch {
        /// Content category, e.g. "native"
        #[arg(long)]
        category: String,

        /// Effective date (YYYY-MM-DD); defaults to today in UTC
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Identifier recorded as the author if this call generates the record
        #[arg(long)]
        requester: String,
    },
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| format!("invalid date '{value}': {e}"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_structured_logging();

    if let Err(e) = run(cli).await {
        error!(error = %e, "content-coordinator failed");
        eprintln!("❌ {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = CoordinatorSettings::load(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Validate => {
            println!("✅ Configuration is valid");
            println!("{}", serde_json::to_string_pretty(&settings.sanitized())?);
        }
        Commands::Fetch {
            category,
            date,
            requester,
        } => {
            let coordinator = build_coordinator(&settings)
                .await
                .context("failed to build coordinator")?;

            let (record, outcome) = match date {
                Some(date) => coordinator.get_or_generate(&category, date, &requester).await?,
                None => coordinator.get_daily(&category, &requester).await?,
            };

            let output = serde_json::json!({
                "outcome": outcome,
                "record": record,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
