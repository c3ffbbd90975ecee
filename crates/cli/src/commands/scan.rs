//! One-shot subnet scan

use super::setup;
use crate::output;
use crate::Cli;
use anyhow::Result;
use scan_lib::scanner::{ProbeConfig, ScanConfig, Scanner};
use scan_lib::store::LogStore;

pub async fn run(cli: &Cli, concurrency: usize) -> Result<()> {
    let price_config = setup::ensure_price(cli)?;
    let scanner = build_scanner(cli, concurrency, price_config.electricity_price)?;

    let summary = scanner.run_cycle().await?;
    output::print_devices(&summary, cli.format);
    output::print_summary(&summary);

    if summary.append_errors > 0 {
        anyhow::bail!("{} log append(s) failed", summary.append_errors);
    }
    Ok(())
}

pub(super) fn build_scanner(
    cli: &Cli,
    concurrency: usize,
    price_eur_per_kwh: f64,
) -> Result<Scanner> {
    let config = ScanConfig {
        probe: ProbeConfig {
            concurrency,
            ..Default::default()
        },
        ..ScanConfig::new(price_eur_per_kwh)
    };
    Scanner::new(LogStore::new(&cli.data_dir), config)
}
