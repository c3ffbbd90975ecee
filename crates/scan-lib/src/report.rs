//! Reporting surface
//!
//! Turns finished per-device logs into ordered (timestamp, cost) series
//! for external chart rendering. Reading is deliberately tolerant:
//! corrupt documents are skipped, entries whose cost cannot be resolved
//! are dropped, and nothing here ever fails a whole report over one bad
//! file.

use crate::cost;
use crate::store::{parse_ts, LogStore, StoreError};
use serde::Serialize;
use tracing::warn;

/// One resolvable observation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CostPoint {
    pub ts: String,
    pub cost_eur: f64,
}

/// Cost-over-time history of one device
#[derive(Debug, Clone, Serialize)]
pub struct CostSeries {
    pub label: String,
    pub points: Vec<CostPoint>,
}

/// Load every device's cost series from the data directory
pub fn load_cost_series(store: &LogStore) -> Result<Vec<CostSeries>, StoreError> {
    let mut series = Vec::new();

    for path in store.list_logs()? {
        let log = match store.load(&path) {
            Ok(log) => log,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable log");
                continue;
            }
        };

        let label = log
            .device
            .hostname
            .clone()
            .or_else(|| log.device.name.clone())
            .unwrap_or_else(|| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string())
            });

        let baseline = log.device.baseline_total_kwh;
        let mut points: Vec<CostPoint> = log
            .entries
            .iter()
            .filter(|entry| parse_ts(&entry.ts).is_some())
            .filter_map(|entry| {
                cost::resolve_entry_cost(entry, baseline).map(|cost_eur| CostPoint {
                    ts: entry.ts.clone(),
                    cost_eur,
                })
            })
            .collect();

        if points.is_empty() {
            continue;
        }

        points.sort_by_key(|p| parse_ts(&p.ts));
        series.push(CostSeries { label, points });
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{write_log_atomic, DeviceLog, LogEntry};
    use tempfile::TempDir;

    fn entry(ts: &str, total: Option<f64>, cost: Option<f64>) -> LogEntry {
        LogEntry {
            ts: ts.to_string(),
            total_kwh: total,
            price_eur_per_kwh: Some(0.30),
            cost_since_first_seen_eur: cost,
        }
    }

    #[test]
    fn test_series_prefers_stored_cost_and_falls_back() {
        let dir = TempDir::new().unwrap();
        let mut log = DeviceLog::new(0.30);
        log.device.name = Some("PC".to_string());
        log.device.baseline_total_kwh = Some(100.0);
        log.entries = vec![
            entry("2025-08-06T12:00:00", Some(100.0), Some(0.0)),
            // stored cost missing, resolvable from total/baseline/price
            entry("2025-08-06T12:10:00", Some(105.0), None),
            // nothing resolvable, dropped
            entry("2025-08-06T12:20:00", None, None),
        ];
        write_log_atomic(&dir.path().join("pc.json"), &log).unwrap();

        let series = load_cost_series(&LogStore::new(dir.path())).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, "PC");
        assert_eq!(series[0].points.len(), 2);
        assert!((series[0].points[1].cost_eur - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_series_sorted_by_timestamp() {
        let dir = TempDir::new().unwrap();
        let mut log = DeviceLog::new(0.30);
        log.device.hostname = Some("plug".to_string());
        log.device.baseline_total_kwh = Some(0.0);
        log.entries = vec![
            entry("2025-08-06T12:20:00", Some(2.0), Some(0.6)),
            entry("2025-08-06T12:00:00", Some(1.0), Some(0.3)),
        ];
        write_log_atomic(&dir.path().join("plug.json"), &log).unwrap();

        let series = load_cost_series(&LogStore::new(dir.path())).unwrap();
        assert_eq!(series[0].points[0].ts, "2025-08-06T12:00:00");
        assert_eq!(series[0].points[1].ts, "2025-08-06T12:20:00");
    }

    #[test]
    fn test_corrupt_log_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{nope").unwrap();

        let mut log = DeviceLog::new(0.30);
        log.device.baseline_total_kwh = Some(0.0);
        log.entries = vec![entry("2025-08-06T12:00:00", Some(1.0), Some(0.3))];
        write_log_atomic(&dir.path().join("good.json"), &log).unwrap();

        let series = load_cost_series(&LogStore::new(dir.path())).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label, "good");
    }

    #[test]
    fn test_empty_data_dir_yields_no_series() {
        let dir = TempDir::new().unwrap();
        let series = load_cost_series(&LogStore::new(dir.path())).unwrap();
        assert!(series.is_empty());
    }
}
