//! Telemetry collection
//!
//! Assembles one `DeviceRecord` per confirmed host from three
//! independent status queries. A failed or malformed query leaves its
//! fields unavailable and never aborts the others; the next scan cycle
//! retries naturally, so there are no retries here.

use crate::cost::{meter_field, meter_value};
use crate::models::DeviceRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Full status tree (identity plus the embedded network section)
pub const CMND_STATUS_ALL: &str = "Status 0";
/// Runtime state: WiFi, uptime
pub const CMND_STATUS_STATE: &str = "Status 11";
/// Energy sensor readings
pub const CMND_STATUS_ENERGY: &str = "Status 8";

/// Seam for issuing device status commands, mockable in tests
#[async_trait]
pub trait StatusClient: Send + Sync {
    /// Run one status command against a host and return the JSON payload
    async fn status(&self, host: &str, command: &str) -> Result<Value>;
}

/// HTTP implementation talking to the device's `/cm` endpoint
pub struct HttpStatusClient {
    client: Client,
    timeout: Duration,
}

impl HttpStatusClient {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

#[async_trait]
impl StatusClient for HttpStatusClient {
    async fn status(&self, host: &str, command: &str) -> Result<Value> {
        let url = format!("http://{}/cm", host);
        let response = self
            .client
            .get(&url)
            .query(&[("cmnd", command)])
            .timeout(self.timeout)
            .send()
            .await
            .with_context(|| format!("Status query failed for {}", host))?;

        response
            .json()
            .await
            .with_context(|| format!("Non-JSON status payload from {}", host))
    }
}

/// Collect a full device record for one confirmed host.
///
/// The three queries are independent; whatever fails stays unavailable.
pub async fn collect_device(client: &dyn StatusClient, host: &str) -> DeviceRecord {
    let mut record = DeviceRecord::unavailable(host);

    match client.status(host, CMND_STATUS_ALL).await {
        Ok(payload) => apply_general_status(&mut record, &payload),
        Err(e) => debug!(host, error = %e, "General status unavailable"),
    }

    match client.status(host, CMND_STATUS_STATE).await {
        Ok(payload) => apply_network_status(&mut record, &payload),
        Err(e) => debug!(host, error = %e, "Network status unavailable"),
    }

    match client.status(host, CMND_STATUS_ENERGY).await {
        Ok(payload) => apply_energy_status(&mut record, &payload),
        Err(e) => debug!(host, error = %e, "Energy status unavailable"),
    }

    record
}

fn apply_general_status(record: &mut DeviceRecord, payload: &Value) {
    let status = payload.get("Status").cloned().unwrap_or(Value::Null);

    // FriendlyName is preferred for display, DeviceName is the fallback
    let friendly = status
        .get("FriendlyName")
        .and_then(|v| v.get(0))
        .and_then(text_value);
    record.name = friendly.or_else(|| status.get("DeviceName").and_then(text_value));
    record.version = payload
        .pointer("/StatusFWR/Version")
        .and_then(text_value)
        .or_else(|| status.get("Version").and_then(text_value));
    record.module = status.get("Module").and_then(text_value);
    // the full tree carries the network section; saves a separate query
    record.mac = payload.pointer("/StatusNET/Mac").and_then(text_value);
}

fn apply_network_status(record: &mut DeviceRecord, payload: &Value) {
    let state = payload.get("StatusSTS").cloned().unwrap_or(Value::Null);
    record.wifi_ssid = state.pointer("/Wifi/SSId").and_then(text_value);
    record.wifi_rssi = state.pointer("/Wifi/RSSI").and_then(meter_value);
    record.uptime = state.get("Uptime").and_then(text_value);
}

fn apply_energy_status(record: &mut DeviceRecord, payload: &Value) {
    let energy = match payload.pointer("/StatusSNS/ENERGY") {
        Some(energy) => energy,
        None => return,
    };
    record.energy.total_kwh = meter_field(energy, "Total");
    record.energy.power_w = meter_field(energy, "Power");
    record.energy.voltage_v = meter_field(energy, "Voltage");
    record.energy.current_a = meter_field(energy, "Current");
    record.energy.today_kwh = meter_field(energy, "Today");
    record.energy.yesterday_kwh = meter_field(energy, "Yesterday");
}

/// Text extraction tolerant of numeric JSON values (e.g. module ids)
fn text_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    /// Canned-response client; missing commands behave like timeouts
    struct FakeStatusClient {
        responses: HashMap<&'static str, Value>,
    }

    #[async_trait]
    impl StatusClient for FakeStatusClient {
        async fn status(&self, _host: &str, command: &str) -> Result<Value> {
            self.responses
                .get(command)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("timeout"))
        }
    }

    fn full_responses() -> HashMap<&'static str, Value> {
        let mut responses = HashMap::new();
        responses.insert(
            CMND_STATUS_ALL,
            json!({
                "Status": {
                    "DeviceName": "Tasmota",
                    "FriendlyName": ["Desk Plug"],
                    "Module": 1
                },
                "StatusFWR": {"Version": "13.2.0(tasmota)"},
                "StatusNET": {"Mac": "54:32:04:F6:63:20", "IPAddress": "192.168.1.30"}
            }),
        );
        responses.insert(
            CMND_STATUS_STATE,
            json!({
                "StatusSTS": {
                    "Uptime": "0T04:10:22",
                    "Wifi": {"SSId": "home-iot", "RSSI": 72}
                }
            }),
        );
        responses.insert(
            CMND_STATUS_ENERGY,
            json!({
                "StatusSNS": {
                    "ENERGY": {
                        "Total": 105.234,
                        "Power": 9,
                        "Voltage": 231,
                        "Current": 0.041,
                        "Today": 0.12,
                        "Yesterday": 0.34
                    }
                }
            }),
        );
        responses
    }

    #[tokio::test]
    async fn test_collect_device_full_record() {
        let client = FakeStatusClient {
            responses: full_responses(),
        };
        let record = collect_device(&client, "192.168.1.30").await;

        assert_eq!(record.host, "192.168.1.30");
        assert_eq!(record.name.as_deref(), Some("Desk Plug"));
        assert_eq!(record.version.as_deref(), Some("13.2.0(tasmota)"));
        assert_eq!(record.module.as_deref(), Some("1"));
        assert_eq!(record.mac.as_deref(), Some("54:32:04:F6:63:20"));
        assert_eq!(record.wifi_ssid.as_deref(), Some("home-iot"));
        assert_eq!(record.wifi_rssi, Some(72.0));
        assert_eq!(record.uptime.as_deref(), Some("0T04:10:22"));
        assert_eq!(record.energy.total_kwh, Some(105.234));
        assert_eq!(record.energy.power_w, Some(9.0));
    }

    #[tokio::test]
    async fn test_collect_device_partial_failure_keeps_rest() {
        let mut responses = full_responses();
        responses.remove(CMND_STATUS_ENERGY);
        let client = FakeStatusClient { responses };

        let record = collect_device(&client, "192.168.1.30").await;
        assert_eq!(record.name.as_deref(), Some("Desk Plug"));
        assert!(!record.energy.has_data());
    }

    #[tokio::test]
    async fn test_collect_device_everything_down() {
        let client = FakeStatusClient {
            responses: HashMap::new(),
        };
        let record = collect_device(&client, "192.168.1.30").await;

        assert_eq!(record.display_name(), "Unknown (192.168.1.30)");
        assert_eq!(record.mac, None);
        assert!(!record.energy.has_data());
    }

    #[tokio::test]
    async fn test_collect_device_missing_keys_are_unavailable() {
        let mut responses = HashMap::new();
        responses.insert(CMND_STATUS_ALL, json!({"Status": {}}));
        responses.insert(CMND_STATUS_STATE, json!({"StatusSTS": {}}));
        responses.insert(
            CMND_STATUS_ENERGY,
            json!({"StatusSNS": {"ENERGY": {"Total": "N/A", "Power": 5}}}),
        );
        let client = FakeStatusClient { responses };

        let record = collect_device(&client, "192.168.1.30").await;
        assert_eq!(record.name, None);
        assert_eq!(record.wifi_ssid, None);
        assert_eq!(record.energy.total_kwh, None);
        assert_eq!(record.energy.power_w, Some(5.0));
    }

    #[tokio::test]
    async fn test_http_status_client_query_encoding() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/cm")
            .match_query(mockito::Matcher::UrlEncoded(
                "cmnd".into(),
                "Status 8".into(),
            ))
            .with_header("content-type", "application/json")
            .with_body(r#"{"StatusSNS":{"ENERGY":{"Total":1.5}}}"#)
            .create_async()
            .await;

        let client = HttpStatusClient::new(Client::new(), Duration::from_secs(2));
        let payload = client
            .status(&server.host_with_port(), CMND_STATUS_ENERGY)
            .await
            .unwrap();
        assert_eq!(payload.pointer("/StatusSNS/ENERGY/Total"), Some(&json!(1.5)));
    }

    #[tokio::test]
    async fn test_http_status_client_non_json_is_error() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/cm")
            .match_query(mockito::Matcher::Any)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let client = HttpStatusClient::new(Client::new(), Duration::from_secs(2));
        assert!(client
            .status(&server.host_with_port(), CMND_STATUS_ALL)
            .await
            .is_err());
    }
}
