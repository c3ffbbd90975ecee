//! Agent configuration

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Agent configuration, read from TASMOTA_* environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Directory holding the per-device JSON logs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Price configuration file
    #[serde(default = "default_price_config")]
    pub price_config: PathBuf,

    /// Seconds between scan cycles
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Maximum in-flight subnet probes
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,

    /// Per-probe timeout in milliseconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Per status query timeout in milliseconds
    #[serde(default = "default_status_timeout")]
    pub status_timeout_ms: u64,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_price_config() -> PathBuf {
    PathBuf::from("tasmota_config.json")
}

fn default_scan_interval() -> u64 {
    10 * 60
}

fn default_probe_concurrency() -> usize {
    32
}

fn default_probe_timeout() -> u64 {
    1000
}

fn default_status_timeout() -> u64 {
    2000
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("TASMOTA"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| AgentConfig {
            data_dir: default_data_dir(),
            price_config: default_price_config(),
            scan_interval_secs: default_scan_interval(),
            probe_concurrency: default_probe_concurrency(),
            probe_timeout_ms: default_probe_timeout(),
            status_timeout_ms: default_status_timeout(),
        }))
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn status_timeout(&self) -> Duration {
        Duration::from_millis(self.status_timeout_ms)
    }
}
