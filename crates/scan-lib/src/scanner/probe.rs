//! Subnet probing
//!
//! Enumerates the local /24 and tests every host for the device
//! signature with a bounded pool of concurrent HTTP probes. A probe that
//! errors, times out or returns a non-matching body is simply "not a
//! device"; probing never fails a scan cycle.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

/// Marker string identifying a supported metering device
pub const DEVICE_SIGNATURE: &str = "Tasmota";

/// Probe pool configuration
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Signature the landing page must contain
    pub signature: String,
    /// Per-probe timeout
    pub timeout: Duration,
    /// Maximum in-flight probes
    pub concurrency: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            signature: DEVICE_SIGNATURE.to_string(),
            timeout: Duration::from_secs(1),
            concurrency: 32,
        }
    }
}

/// All 254 host candidates in the /24 the given address belongs to
pub fn host_candidates(local_ip: Ipv4Addr) -> Vec<Ipv4Addr> {
    let [a, b, c, _] = local_ip.octets();
    (1..=254).map(|d| Ipv4Addr::new(a, b, c, d)).collect()
}

/// Determine the machine's own IPv4 address via the UDP connect trick
/// (no packet is sent; the OS just picks the outbound interface)
pub fn detect_local_ipv4() -> Result<Ipv4Addr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).context("Failed to bind detection socket")?;
    socket
        .connect(("8.8.8.8", 80))
        .context("Failed to select an outbound interface")?;

    match socket.local_addr().context("No local address")?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Ok(ip),
        other => bail!("No usable local IPv4 address (got {})", other),
    }
}

/// Probe one host: fetch its landing page and look for the signature
pub async fn probe_host(client: &Client, host: &str, signature: &str, timeout: Duration) -> bool {
    let url = format!("http://{}/", host);
    let response = match client.get(&url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(_) => return false,
    };
    match response.text().await {
        Ok(body) => body.contains(signature),
        Err(_) => false,
    }
}

/// Probe every candidate with bounded parallelism.
///
/// Each worker owns its probe and returns its own verdict; results are
/// combined only after the tasks finish. Confirmed hosts come back in
/// ascending numeric order for stable downstream output.
pub async fn probe_subnet(
    client: &Client,
    candidates: Vec<Ipv4Addr>,
    config: &ProbeConfig,
) -> Vec<Ipv4Addr> {
    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut tasks: JoinSet<Option<Ipv4Addr>> = JoinSet::new();

    for ip in candidates {
        let semaphore = semaphore.clone();
        let client = client.clone();
        let signature = config.signature.clone();
        let timeout = config.timeout;

        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            if probe_host(&client, &ip.to_string(), &signature, timeout).await {
                Some(ip)
            } else {
                None
            }
        });
    }

    let mut confirmed = Vec::new();
    while let Some(result) = tasks.join_next().await {
        if let Ok(Some(ip)) = result {
            debug!(host = %ip, "Device signature matched");
            confirmed.push(ip);
        }
    }

    confirmed.sort();
    info!(found = confirmed.len(), "Subnet probe complete");
    confirmed
}
