//! Tasmota Agent - periodic energy logger
//!
//! Long-running daemon that scans the local subnet for metering devices
//! on a fixed interval and appends their readings to the per-device log
//! store until it receives SIGINT.

use anyhow::Result;
use scan_lib::config::PriceConfig;
use scan_lib::scanner::{ProbeConfig, ScanConfig, ScanLoop, Scanner};
use scan_lib::store::LogStore;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting tasmota-agent");

    let config = config::AgentConfig::load()?;
    info!(
        data_dir = %config.data_dir.display(),
        interval_secs = config.scan_interval_secs,
        "Agent configured"
    );

    // The daemon never prompts; absent or corrupt price config falls
    // back to the default and is recreated on disk
    let (price_config, created) = PriceConfig::load_or_create_default(&config.price_config)?;
    if created {
        info!(
            price_eur_per_kwh = price_config.electricity_price,
            path = %config.price_config.display(),
            "Price configuration created"
        );
    }

    let scan_config = ScanConfig {
        probe: ProbeConfig {
            timeout: config.probe_timeout(),
            concurrency: config.probe_concurrency,
            ..Default::default()
        },
        status_timeout: config.status_timeout(),
        price_eur_per_kwh: price_config.electricity_price,
    };

    let store = LogStore::new(&config.data_dir);
    let scanner = Scanner::new(store, scan_config)?;
    let scan_loop = ScanLoop::new(scanner, config.scan_interval());

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(scan_loop.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("SIGINT received, shutting down");
    let _ = shutdown_tx.send(());
    let _ = loop_handle.await;

    Ok(())
}
