mod api;
mod cli;
mod config;
mod ingest;
mod model;
mod store;

use anyhow::{Context, Error, Result};
use chrono::Local;
use clap::Parser;
use cli::{command, resolve_range, Cli, Commands};
use config::Config;
use env_logger::Env;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to read configuration")?;

    match cli.command {
        Commands::History {
            start_date,
            end_date,
            days,
        } => {
            let today = Local::now().date_naive();
            let (start, end) = resolve_range(start_date, end_date, days, today)?;
            command::history(&config, start, end).await?;
        }
        Commands::Current {} => {
            command::current(&config).await?;
        }
    }

    Ok(())
}
