//! Tasmota Scan CLI
//!
//! A command-line tool for scanning the local subnet for metering
//! devices, logging their energy readings, merging device logs and
//! reporting cost over time.

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Tasmota Scan CLI
#[derive(Parser)]
#[command(name = "tascan")]
#[command(author, version, about = "CLI for the Tasmota energy scanner", long_about = None)]
pub struct Cli {
    /// Directory holding the per-device JSON logs
    #[arg(long, env = "TASMOTA_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Price configuration file
    #[arg(long, env = "TASMOTA_PRICE_CONFIG", default_value = "tasmota_config.json")]
    pub price_config: PathBuf,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the local subnet once and log energy readings
    Scan {
        /// Maximum in-flight probes
        #[arg(long, default_value_t = 32)]
        concurrency: usize,
    },

    /// Scan repeatedly on a fixed interval until interrupted
    Watch {
        /// Seconds between scan starts
        #[arg(long, default_value_t = 600)]
        interval: u64,

        /// Maximum in-flight probes
        #[arg(long, default_value_t = 32)]
        concurrency: usize,
    },

    /// Merge one device log into another
    Merge {
        /// Log that receives the merged history
        target: PathBuf,

        /// Log merged in; deleted after success unless --keep-source
        source: PathBuf,

        /// Leave the source file in place
        #[arg(long)]
        keep_source: bool,
    },

    /// Show per-device cost-over-time series from the logs
    Report,

    /// Configure the electricity price
    Setup {
        /// Price in EUR/kWh; prompts interactively when omitted
        #[arg(long)]
        price: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // tables and status lines go to stdout; keep tracing quiet unless
    // asked for via RUST_LOG
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().compact())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Scan { concurrency } => commands::scan::run(&cli, *concurrency).await,
        Commands::Watch {
            interval,
            concurrency,
        } => commands::watch::run(&cli, *interval, *concurrency).await,
        Commands::Merge {
            target,
            source,
            keep_source,
        } => commands::merge::run(target, source, *keep_source),
        Commands::Report => commands::report::run(&cli),
        Commands::Setup { price } => commands::setup::run(&cli, *price),
    }
}
