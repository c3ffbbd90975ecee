//! Scan cycle orchestration
//!
//! One cycle runs prober -> collector -> cost accounting -> log store
//! and produces the summary consumed by reporting. Collection runs in
//! parallel across confirmed devices; workers return their own records
//! and aggregation happens only after all of them finish.

use super::probe::{self, ProbeConfig};
use super::telemetry::{collect_device, HttpStatusClient, StatusClient};
use crate::cost;
use crate::models::DeviceRecord;
use crate::store::LogStore;
use anyhow::{Context, Result};
use chrono::SecondsFormat;
use reqwest::Client;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info};

/// Everything one scan cycle needs to know
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub probe: ProbeConfig,
    /// Timeout per status query
    pub status_timeout: Duration,
    /// Electricity price in effect for this cycle (EUR/kWh)
    pub price_eur_per_kwh: f64,
}

impl ScanConfig {
    pub fn new(price_eur_per_kwh: f64) -> Self {
        Self {
            probe: ProbeConfig::default(),
            status_timeout: Duration::from_secs(2),
            price_eur_per_kwh,
        }
    }
}

/// Outcome of one completed scan cycle
#[derive(Debug, Clone)]
pub struct ScanSummary {
    /// Confirmed devices, ascending by address
    pub devices: Vec<DeviceRecord>,
    /// Price used for cost figures this cycle
    pub price_eur_per_kwh: f64,
    /// Sum of price x lifetime total across devices that reported one
    pub total_cost_eur: f64,
    /// Log entries written
    pub appended: usize,
    /// Appends that failed (previous on-disk version stays intact)
    pub append_errors: usize,
    pub elapsed: Duration,
}

impl ScanSummary {
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

/// Drives one full scan cycle
pub struct Scanner {
    client: Client,
    status_client: Arc<dyn StatusClient>,
    store: LogStore,
    config: ScanConfig,
}

impl Scanner {
    pub fn new(store: LogStore, config: ScanConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        let status_client = Arc::new(HttpStatusClient::new(
            client.clone(),
            config.status_timeout,
        ));
        Ok(Self {
            client,
            status_client,
            store,
            config,
        })
    }

    /// Construct with a custom status client (used by tests)
    pub fn with_status_client(
        store: LogStore,
        config: ScanConfig,
        status_client: Arc<dyn StatusClient>,
    ) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            status_client,
            store,
            config,
        })
    }

    pub fn store(&self) -> &LogStore {
        &self.store
    }

    pub fn price_eur_per_kwh(&self) -> f64 {
        self.config.price_eur_per_kwh
    }

    /// Probe the local /24 and poll every confirmed device
    pub async fn run_cycle(&self) -> Result<ScanSummary> {
        let local_ip =
            probe::detect_local_ipv4().context("Could not determine local IPv4 address")?;
        let [a, b, c, _] = local_ip.octets();
        info!(subnet = %format!("{}.{}.{}.0/24", a, b, c), "Scanning subnet");

        let candidates = probe::host_candidates(local_ip);
        let confirmed = probe::probe_subnet(&self.client, candidates, &self.config.probe).await;
        self.poll_devices(confirmed).await
    }

    /// Poll a known set of confirmed devices and persist their entries
    pub async fn poll_devices(&self, hosts: Vec<Ipv4Addr>) -> Result<ScanSummary> {
        let started = Instant::now();

        let mut tasks: JoinSet<DeviceRecord> = JoinSet::new();
        for host in &hosts {
            let status_client = self.status_client.clone();
            let host = host.to_string();
            tasks.spawn(async move { collect_device(status_client.as_ref(), &host).await });
        }

        let mut devices = Vec::with_capacity(hosts.len());
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(record) => devices.push(record),
                Err(e) => error!(error = %e, "Collection task panicked"),
            }
        }
        devices.sort_by(|a, b| host_sort_key(&a.host).cmp(&host_sort_key(&b.host)));

        let price = self.config.price_eur_per_kwh;
        let ts = now_ts();
        let mut appended = 0;
        let mut append_errors = 0;
        let mut total_cost_eur = 0.0;

        for record in &devices {
            if let Some(device_cost) = cost::lifetime_cost(&record.energy, price) {
                total_cost_eur += device_cost;
            }
            // nothing plottable without a total; the record is reported
            // in the summary but produces no log entry
            if record.energy.total_kwh.is_none() {
                continue;
            }
            match self.store.append_observation(record, price, &ts) {
                Ok(_) => appended += 1,
                Err(e) => {
                    append_errors += 1;
                    error!(
                        device = %record.display_name(),
                        error = %e,
                        "Failed to append log entry"
                    );
                }
            }
        }

        let summary = ScanSummary {
            devices,
            price_eur_per_kwh: price,
            total_cost_eur,
            appended,
            append_errors,
            elapsed: started.elapsed(),
        };

        if summary.devices.is_empty() {
            info!("No devices found on the network");
        } else {
            info!(
                devices = summary.device_count(),
                total_cost_eur = summary.total_cost_eur,
                appended = summary.appended,
                append_errors = summary.append_errors,
                "Scan cycle complete"
            );
        }

        Ok(summary)
    }
}

/// Numeric sort key so "192.168.1.9" orders before "192.168.1.30"
fn host_sort_key(host: &str) -> (u32, String) {
    match host.parse::<Ipv4Addr>() {
        Ok(ip) => (u32::from(ip), String::new()),
        Err(_) => (u32::MAX, host.to_string()),
    }
}

fn now_ts() -> String {
    chrono::Local::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
