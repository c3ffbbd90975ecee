//! Cost-over-time report

use crate::output;
use crate::Cli;
use anyhow::{Context, Result};
use scan_lib::report::load_cost_series;
use scan_lib::store::LogStore;

pub fn run(cli: &Cli) -> Result<()> {
    let store = LogStore::new(&cli.data_dir);
    let series = load_cost_series(&store)
        .with_context(|| format!("Failed to read logs from {}", cli.data_dir.display()))?;
    output::print_series(&series, cli.format);
    Ok(())
}
