//! Per-device log store
//!
//! One append-only JSON document per physical device, written with the
//! temp-file-plus-rename discipline so a reader never observes a half
//! written file and a crash mid-write leaves the previous version
//! intact. Entries are kept sorted ascending by timestamp.

mod merge;

pub use merge::{merge_files, merge_logs, MergeOutcome};

use crate::cost;
use crate::models::DeviceRecord;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Highest log document format this build understands
pub const SCHEMA_VERSION: u32 = 1;

/// Fallback electricity price recorded in fresh documents (EUR/kWh)
pub const DEFAULT_PRICE_EUR_PER_KWH: f64 = 0.329;

/// Errors raised by the log store and the merge operation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unsupported schema version {found} in {path} (supported up to {supported})")]
    UnsupportedSchema {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("source and target are the same file: {0}")]
    SamePath(PathBuf),

    #[error("source log not found: {0}")]
    SourceMissing(PathBuf),

    #[error("invalid device log {path}: {reason}")]
    InvalidLog { path: PathBuf, reason: String },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// One immutable, timestamped observation.
///
/// `ts` stays the exact string that was written so a document round-trips
/// bit-for-bit; ordering and dedup parse it on demand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub ts: String,
    #[serde(default, deserialize_with = "de_meter")]
    pub total_kwh: Option<f64>,
    #[serde(default, deserialize_with = "de_meter")]
    pub price_eur_per_kwh: Option<f64>,
    #[serde(default, deserialize_with = "de_meter")]
    pub cost_since_first_seen_eur: Option<f64>,
}

/// Identity block of a device log
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeviceIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Cumulative counter value the first time this device was logged.
    /// Set once, never decreased; all incremental cost is relative to it.
    #[serde(default, deserialize_with = "de_meter")]
    pub baseline_total_kwh: Option<f64>,
}

/// The persisted per-device history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceLog {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_price")]
    pub price_eur_per_kwh_default: f64,
    #[serde(default)]
    pub device: DeviceIdentity,
    #[serde(default)]
    pub entries: Vec<LogEntry>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn default_price() -> f64 {
    DEFAULT_PRICE_EUR_PER_KWH
}

impl DeviceLog {
    /// Fresh, empty document for a device never seen before
    pub fn new(price_eur_per_kwh: f64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            price_eur_per_kwh_default: price_eur_per_kwh,
            device: DeviceIdentity::default(),
            entries: Vec::new(),
        }
    }

    /// Sort entries ascending by timestamp; unparseable timestamps sort
    /// last, ordered by their raw string
    pub fn sort_entries(&mut self) {
        self.entries
            .sort_by_key(|e| (parse_ts(&e.ts).is_none(), parse_ts(&e.ts), e.ts.clone()));
    }
}

/// Permissive deserializer for meter values in log documents. Legacy
/// files written by earlier tooling carry "N/A" strings where numbers
/// belong; those load as `None` instead of failing the whole document.
fn de_meter<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(cost::meter_value))
}

/// Parse an entry timestamp for ordering and dedup.
///
/// Accepts RFC 3339 as written by this tool and the naive ISO-8601 form
/// older logs carry. Comparison is by wall-clock time with offsets
/// dropped: all logs for a device are assumed to come from the same
/// timezone, so a naive legacy timestamp and an offset-bearing one with
/// the same wall clock denote the same observation.
pub(crate) fn parse_ts(ts: &str) -> Option<NaiveDateTime> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(ts) {
        return Some(parsed.naive_local());
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f").ok()
}

/// Canonical dedup key for an entry timestamp: parseable timestamps that
/// denote the same instant collapse to one key regardless of formatting
pub(crate) fn ts_key(ts: &str) -> String {
    match parse_ts(ts) {
        Some(parsed) => parsed.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        None => ts.to_string(),
    }
}

/// Directory of per-device JSON log files
#[derive(Debug, Clone)]
pub struct LogStore {
    data_dir: PathBuf,
}

impl LogStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File the given device logs to: `<Name>__<MAC>.json`, falling back
    /// to the host when the device reported no MAC
    pub fn log_path(&self, record: &DeviceRecord) -> PathBuf {
        let name = sanitize_component(&record.display_name());
        let suffix = match &record.mac {
            Some(mac) => sanitize_component(&mac.replace(':', "")),
            None => sanitize_component(&record.host),
        };
        self.data_dir.join(format!("{}__{}.json", name, suffix))
    }

    /// Load a device log, enforcing the schema gate
    pub fn load(&self, path: &Path) -> Result<DeviceLog, StoreError> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;

        let log: DeviceLog =
            serde_json::from_str(&data).map_err(|e| StoreError::InvalidLog {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        if log.schema_version > SCHEMA_VERSION {
            return Err(StoreError::UnsupportedSchema {
                path: path.to_path_buf(),
                found: log.schema_version,
                supported: SCHEMA_VERSION,
            });
        }

        Ok(log)
    }

    /// Load an existing log or start a fresh one for a first observation
    pub fn load_or_new(
        &self,
        path: &Path,
        price_eur_per_kwh: f64,
    ) -> Result<DeviceLog, StoreError> {
        if path.exists() {
            self.load(path)
        } else {
            Ok(DeviceLog::new(price_eur_per_kwh))
        }
    }

    /// Append one observation for a device and persist the document.
    ///
    /// First observation of a device sets the baseline to the current
    /// total; subsequent appends leave the baseline untouched. Returns
    /// the path written.
    pub fn append_observation(
        &self,
        record: &DeviceRecord,
        price_eur_per_kwh: f64,
        ts: &str,
    ) -> Result<PathBuf, StoreError> {
        let path = self.log_path(record);
        let mut log = self.load_or_new(&path, price_eur_per_kwh)?;

        let total = record.energy.total_kwh;
        if log.device.baseline_total_kwh.is_none() {
            log.device.baseline_total_kwh = total;
            debug!(
                device = %record.display_name(),
                baseline_kwh = ?total,
                "Baseline established"
            );
        }

        refresh_identity(&mut log.device, record);

        let entry_cost = match (total, log.device.baseline_total_kwh) {
            (Some(total), Some(baseline)) => {
                Some(cost::cost_since_first_seen(total, baseline, price_eur_per_kwh))
            }
            _ => None,
        };

        log.entries.push(LogEntry {
            ts: ts.to_string(),
            total_kwh: total,
            price_eur_per_kwh: Some(price_eur_per_kwh),
            cost_since_first_seen_eur: entry_cost,
        });
        log.sort_entries();

        write_log_atomic(&path, &log)?;
        debug!(path = %path.display(), entries = log.entries.len(), "Log entry appended");
        Ok(path)
    }

    /// List every log file in the data directory, sorted by file name
    pub fn list_logs(&self) -> Result<Vec<PathBuf>, StoreError> {
        if !self.data_dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.data_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "json").unwrap_or(false))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

/// Carry current identity fields into the document, filling gaps and
/// tracking the address the device is reachable at now
fn refresh_identity(identity: &mut DeviceIdentity, record: &DeviceRecord) {
    if identity.name.is_none() {
        identity.name = record.name.clone();
    }
    if identity.hostname.is_none() {
        identity.hostname = Some(record.display_name());
    }
    if identity.mac.is_none() {
        identity.mac = record.mac.clone();
    }
    if identity.module.is_none() {
        identity.module = record.module.clone();
    }
    identity.version = record.version.clone().or(identity.version.take());
    identity.ip = Some(record.host.clone());
}

/// Replace a log file atomically: write to a temp file in the same
/// directory, fsync, then rename over the target
pub fn write_log_atomic(path: &Path, log: &DeviceLog) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut json = serde_json::to_vec_pretty(log).map_err(|e| StoreError::InvalidLog {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    json.push(b'\n');

    let temp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|source| StoreError::Write {
            path: temp_path.clone(),
            source,
        })?;

    file.write_all(&json).map_err(|source| StoreError::Write {
        path: temp_path.clone(),
        source,
    })?;
    file.sync_all().map_err(|source| StoreError::Write {
        path: temp_path.clone(),
        source,
    })?;

    std::fs::rename(&temp_path, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), "Device log written");
    Ok(())
}

/// Reduce a name to characters safe in a file name
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "device".to_string()
    } else {
        cleaned
    }
}
