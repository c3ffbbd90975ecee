//! Core data models for the scanner

use serde::{Deserialize, Serialize};

/// Raw meter values read from a device at poll time.
///
/// Every field may be absent: a query timeout, a non-energy device or a
/// missing JSON key all leave the field `None` rather than failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnergySnapshot {
    /// Cumulative total energy in kWh (non-decreasing unless the device
    /// counter is reset)
    pub total_kwh: Option<f64>,
    /// Instantaneous power draw in W
    pub power_w: Option<f64>,
    /// Line voltage in V
    pub voltage_v: Option<f64>,
    /// Line current in A
    pub current_a: Option<f64>,
    /// Energy consumed today in kWh
    pub today_kwh: Option<f64>,
    /// Energy consumed yesterday in kWh
    pub yesterday_kwh: Option<f64>,
}

impl EnergySnapshot {
    /// Returns true if the device reported any metering data at all
    pub fn has_data(&self) -> bool {
        self.total_kwh.is_some()
            || self.power_w.is_some()
            || self.voltage_v.is_some()
            || self.current_a.is_some()
            || self.today_kwh.is_some()
            || self.yesterday_kwh.is_some()
    }
}

/// One discovered device for a single poll cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Host the device was reached at ("192.168.1.30")
    pub host: String,
    /// Display name (FriendlyName preferred over DeviceName)
    pub name: Option<String>,
    /// Firmware version string
    pub version: Option<String>,
    /// Hardware module identifier
    pub module: Option<String>,
    /// MAC address as reported by the device
    pub mac: Option<String>,
    /// SSID of the WiFi network the device is joined to
    pub wifi_ssid: Option<String>,
    /// WiFi signal strength (RSSI percent)
    pub wifi_rssi: Option<f64>,
    /// Uptime string as reported ("0T01:23:45")
    pub uptime: Option<String>,
    /// Metering values read in this poll
    pub energy: EnergySnapshot,
}

impl DeviceRecord {
    /// Empty record for a host; queries fill in what they can
    pub fn unavailable(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            name: None,
            version: None,
            module: None,
            mac: None,
            wifi_ssid: None,
            wifi_rssi: None,
            uptime: None,
            energy: EnergySnapshot::default(),
        }
    }

    /// Display name, falling back to the host when the device gave none
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Unknown ({})", self.host))
    }
}
