mod about;
mod analytics;
mod bills;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;

use token_analyzer::config::Settings;
use token_analyzer::types::Result;

use about::AboutArgs;
use analytics::AnalyticsArgs;
use bills::BillsArgs;

/// Spending analytics for KPLC prepaid electricity tokens
#[derive(Parser)]
#[command(name = "token-analyzer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the bill store (overrides config)
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Settings file (default: ~/.token-analyzer/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report that the tool is alive
    Health,

    /// Look up a meter and refresh its stored purchases
    About(AboutArgs),

    /// List stored purchases, newest first
    Bills(BillsArgs),

    /// Daily, weekly, monthly and yearly spending rollups
    Analytics(AnalyticsArgs),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let Cli {
            data_dir,
            config,
            command,
        } = self;
        let settings = || load_settings(config.as_deref(), data_dir.clone());

        match command {
            Commands::Health => print_json(&json!({ "status": "API is running" })),
            Commands::About(args) => print_json(&args.run(settings()).await),
            Commands::Bills(args) => print_json(&args.run(&settings()?)?),
            Commands::Analytics(args) => print_json(&args.run(&settings()?)?),
        }
    }
}

fn load_settings(config: Option<&std::path::Path>, data_dir: Option<PathBuf>) -> Result<Settings> {
    let mut settings = Settings::load(config)?;
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    Ok(settings)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
