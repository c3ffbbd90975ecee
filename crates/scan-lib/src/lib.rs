//! Library for the Tasmota energy scanner
//!
//! This crate provides the core functionality for:
//! - Subnet probing and device discovery
//! - Telemetry collection over the device HTTP API
//! - Cost accounting from cumulative meter readings
//! - The append-only, mergeable per-device log store
//! - The periodic scan loop and the reporting surface

pub mod config;
pub mod cost;
pub mod models;
pub mod report;
pub mod scanner;
pub mod store;

pub use config::PriceConfig;
pub use models::{DeviceRecord, EnergySnapshot};
pub use report::{load_cost_series, CostPoint, CostSeries};
pub use scanner::{ScanConfig, ScanLoop, ScanSummary, Scanner};
pub use store::{
    merge_files, merge_logs, DeviceLog, LogEntry, LogStore, MergeOutcome, StoreError,
    SCHEMA_VERSION,
};
