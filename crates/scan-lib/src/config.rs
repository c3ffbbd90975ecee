//! Electricity price configuration
//!
//! A small JSON file holding the effective EUR/kWh price and the dates
//! it was created and last changed. Reading a missing or corrupt file is
//! a recoverable condition: callers recreate it (interactively in the
//! CLI, with the default in the daemon).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Fallback price when nothing was ever configured (EUR/kWh)
pub const DEFAULT_ELECTRICITY_PRICE: f64 = 0.329;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceConfig {
    /// Effective electricity price in EUR/kWh
    pub electricity_price: f64,
    /// Date the file was first created (YYYY-MM-DD)
    pub created_date: String,
    /// Date the price was last changed (YYYY-MM-DD)
    pub last_updated: String,
}

impl PriceConfig {
    pub fn new(electricity_price: f64) -> Self {
        let today = today();
        Self {
            electricity_price,
            created_date: today.clone(),
            last_updated: today,
        }
    }

    /// Load and validate; a missing file, unreadable JSON or nonsensical
    /// price all come back as errors for the caller to recover from
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read price config {}", path.display()))?;
        let config: PriceConfig = serde_json::from_str(&data)
            .with_context(|| format!("Corrupt price config {}", path.display()))?;

        if !config.electricity_price.is_finite() || config.electricity_price <= 0.0 {
            bail!(
                "Price config {} holds an invalid price: {}",
                path.display(),
                config.electricity_price
            );
        }

        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut json = serde_json::to_vec_pretty(self).context("Failed to serialize config")?;
        json.push(b'\n');
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write price config {}", path.display()))?;
        Ok(())
    }

    /// Change the price, bumping `last_updated`
    pub fn set_price(&mut self, electricity_price: f64) {
        self.electricity_price = electricity_price;
        self.last_updated = today();
    }

    /// Load the config, recreating it with the default price when absent
    /// or corrupt. Returns the config and whether it was just created.
    pub fn load_or_create_default(path: &Path) -> Result<(Self, bool)> {
        match Self::load(path) {
            Ok(config) => {
                info!(
                    price_eur_per_kwh = config.electricity_price,
                    "Price configuration loaded"
                );
                Ok((config, false))
            }
            Err(e) => {
                warn!(error = %e, "Recreating price configuration with defaults");
                let config = Self::new(DEFAULT_ELECTRICITY_PRICE);
                config.save(path)?;
                Ok((config, true))
            }
        }
    }
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasmota_config.json");

        let config = PriceConfig::new(0.25);
        config.save(&path).unwrap();

        let loaded = PriceConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(PriceConfig::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_load_rejects_invalid_price() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"electricity_price": -1.0, "created_date": "2025-08-06", "last_updated": "2025-08-06"}"#,
        )
        .unwrap();
        assert!(PriceConfig::load(&path).is_err());
    }

    #[test]
    fn test_load_or_create_default_recovers_from_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{garbage").unwrap();

        let (config, created) = PriceConfig::load_or_create_default(&path).unwrap();
        assert!(created);
        assert_eq!(config.electricity_price, DEFAULT_ELECTRICITY_PRICE);

        // the recreated file loads cleanly afterwards
        let (again, created) = PriceConfig::load_or_create_default(&path).unwrap();
        assert!(!created);
        assert_eq!(again.electricity_price, DEFAULT_ELECTRICITY_PRICE);
    }

    #[test]
    fn test_set_price_bumps_last_updated() {
        let mut config = PriceConfig {
            electricity_price: 0.3,
            created_date: "2020-01-01".to_string(),
            last_updated: "2020-01-01".to_string(),
        };
        config.set_price(0.35);
        assert_eq!(config.electricity_price, 0.35);
        assert_ne!(config.last_updated, "2020-01-01");
        assert_eq!(config.created_date, "2020-01-01");
    }
}
