//! Device discovery and telemetry collection
//!
//! The scanner pipeline for one cycle: probe the local /24 for hosts
//! carrying the device signature, poll each confirmed device for status
//! and energy data, account costs and hand entries to the log store.

mod cycle;
mod r#loop;
mod probe;
mod telemetry;

pub use cycle::{ScanConfig, ScanSummary, Scanner};
pub use probe::{
    detect_local_ipv4, host_candidates, probe_host, probe_subnet, ProbeConfig, DEVICE_SIGNATURE,
};
pub use r#loop::ScanLoop;
pub use telemetry::{
    collect_device, HttpStatusClient, StatusClient, CMND_STATUS_ALL, CMND_STATUS_ENERGY,
    CMND_STATUS_STATE,
};
