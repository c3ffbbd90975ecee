//! Price configuration setup

use crate::output;
use crate::Cli;
use anyhow::{bail, Context, Result};
use scan_lib::config::{PriceConfig, DEFAULT_ELECTRICITY_PRICE};
use std::io::Write;

/// Create or update the price configuration
pub fn run(cli: &Cli, price: Option<f64>) -> Result<()> {
    let price = match price {
        Some(price) => {
            validate(price)?;
            price
        }
        None => prompt_price()?,
    };

    // keep the original creation date when updating an existing file
    let config = match PriceConfig::load(&cli.price_config) {
        Ok(mut existing) => {
            existing.set_price(price);
            existing
        }
        Err(_) => PriceConfig::new(price),
    };

    config.save(&cli.price_config)?;
    output::print_success(&format!(
        "Configuration saved: {} EUR/kWh ({})",
        config.electricity_price,
        cli.price_config.display()
    ));
    Ok(())
}

/// Load the price config, running the interactive first-run capture
/// when it is absent or corrupt
pub fn ensure_price(cli: &Cli) -> Result<PriceConfig> {
    match PriceConfig::load(&cli.price_config) {
        Ok(config) => Ok(config),
        Err(_) => {
            output::print_info("No usable configuration found, setting up electricity price");
            let config = PriceConfig::new(prompt_price()?);
            config.save(&cli.price_config)?;
            output::print_success(&format!(
                "Configuration saved: {} EUR/kWh",
                config.electricity_price
            ));
            Ok(config)
        }
    }
}

fn prompt_price() -> Result<f64> {
    loop {
        print!(
            "Electricity price in EUR/kWh [default: {}]: ",
            DEFAULT_ELECTRICITY_PRICE
        );
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        let line = line.trim();

        if line.is_empty() {
            return Ok(DEFAULT_ELECTRICITY_PRICE);
        }
        match line.parse::<f64>() {
            Ok(price) if validate(price).is_ok() => return Ok(price),
            _ => output::print_error("Please enter a number greater than 0"),
        }
    }
}

fn validate(price: f64) -> Result<()> {
    if !price.is_finite() || price <= 0.0 {
        bail!("Price must be a number greater than 0 (got {})", price);
    }
    Ok(())
}
