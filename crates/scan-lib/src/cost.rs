//! Cost accounting
//!
//! Converts cumulative meter readings into EUR figures. Two models live
//! here: the incremental "cost since first seen" used for log entries
//! (relative to a per-device baseline, clamped at zero so counter resets
//! never produce negative cost) and the instantaneous lifetime cost used
//! for cycle summaries.

use crate::models::EnergySnapshot;
use crate::store::LogEntry;
use serde_json::Value;

/// Parse a meter value from external JSON.
///
/// Devices and legacy log files mix numbers, numeric strings and the
/// literal sentinel "N/A". Anything that is not a usable number parses
/// to `None`, never an error.
pub fn meter_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.eq_ignore_ascii_case("n/a") {
                return None;
            }
            s.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Convenience lookup: parse a meter value out of a JSON object field
pub fn meter_field(object: &Value, key: &str) -> Option<f64> {
    object.get(key).and_then(meter_value)
}

/// Incremental cost of one observation relative to the device baseline.
///
/// The clamp at zero absorbs device counter resets (total smaller than
/// baseline after a firmware reset or power loss) and floating-point
/// noise; both count as zero incremental cost for the entry.
pub fn cost_since_first_seen(total_kwh: f64, baseline_kwh: f64, price_eur_per_kwh: f64) -> f64 {
    (total_kwh - baseline_kwh).max(0.0) * price_eur_per_kwh
}

/// Resolve the cost figure for a stored log entry.
///
/// A precomputed `cost_since_first_seen_eur` is authoritative; the
/// fallback recomputes from total, baseline and the entry's price. `None`
/// when neither path has enough data.
pub fn resolve_entry_cost(entry: &LogEntry, baseline_kwh: Option<f64>) -> Option<f64> {
    if let Some(cost) = entry.cost_since_first_seen_eur {
        return Some(cost);
    }
    let total = entry.total_kwh?;
    let baseline = baseline_kwh?;
    let price = entry.price_eur_per_kwh?;
    Some(cost_since_first_seen(total, baseline, price))
}

/// Lifetime cost of everything the device's counter has ever measured
pub fn lifetime_cost(energy: &EnergySnapshot, price_eur_per_kwh: f64) -> Option<f64> {
    energy.total_kwh.map(|total| total * price_eur_per_kwh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meter_value_numbers_and_strings() {
        assert_eq!(meter_value(&json!(5.25)), Some(5.25));
        assert_eq!(meter_value(&json!(7)), Some(7.0));
        assert_eq!(meter_value(&json!("3.14")), Some(3.14));
        assert_eq!(meter_value(&json!(" 42 ")), Some(42.0));
    }

    #[test]
    fn test_meter_value_sentinels() {
        assert_eq!(meter_value(&json!("N/A")), None);
        assert_eq!(meter_value(&json!("n/a")), None);
        assert_eq!(meter_value(&json!("")), None);
        assert_eq!(meter_value(&json!("   ")), None);
        assert_eq!(meter_value(&Value::Null), None);
        assert_eq!(meter_value(&json!("watts")), None);
        assert_eq!(meter_value(&json!({"nested": 1})), None);
    }

    #[test]
    fn test_meter_field_missing_key() {
        let object = json!({"Total": 105.0});
        assert_eq!(meter_field(&object, "Total"), Some(105.0));
        assert_eq!(meter_field(&object, "Power"), None);
    }

    #[test]
    fn test_cost_since_first_seen() {
        // baseline 100.0, next total 105.0 at 0.30 EUR/kWh -> 1.50 EUR
        let cost = cost_since_first_seen(105.0, 100.0, 0.30);
        assert!((cost - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_cost_clamped_on_counter_reset() {
        // device reset its counter to 2.0 kWh below the 100.0 baseline
        let cost = cost_since_first_seen(2.0, 100.0, 0.30);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn test_cost_clamped_on_float_noise() {
        let cost = cost_since_first_seen(99.999_999_999, 100.0, 0.30);
        assert_eq!(cost, 0.0);
    }

    #[test]
    fn test_cost_monotone_in_total() {
        let baseline = 50.0;
        let price = 0.25;
        let mut last = 0.0;
        for total in [50.0, 51.0, 55.5, 60.0, 80.0] {
            let cost = cost_since_first_seen(total, baseline, price);
            assert!(cost >= last);
            last = cost;
        }
    }

    #[test]
    fn test_resolve_entry_cost_prefers_stored() {
        let entry = LogEntry {
            ts: "2025-08-06T12:00:00".to_string(),
            total_kwh: Some(105.0),
            price_eur_per_kwh: Some(0.30),
            cost_since_first_seen_eur: Some(9.99),
        };
        assert_eq!(resolve_entry_cost(&entry, Some(100.0)), Some(9.99));
    }

    #[test]
    fn test_resolve_entry_cost_fallback() {
        let entry = LogEntry {
            ts: "2025-08-06T12:00:00".to_string(),
            total_kwh: Some(105.0),
            price_eur_per_kwh: Some(0.30),
            cost_since_first_seen_eur: None,
        };
        let cost = resolve_entry_cost(&entry, Some(100.0)).unwrap();
        assert!((cost - 1.5).abs() < 1e-9);

        // no baseline, no stored cost -> unresolvable
        assert_eq!(resolve_entry_cost(&entry, None), None);
    }

    #[test]
    fn test_lifetime_cost() {
        let energy = EnergySnapshot {
            total_kwh: Some(10.0),
            ..Default::default()
        };
        let cost = lifetime_cost(&energy, 0.329).unwrap();
        assert!((cost - 3.29).abs() < 1e-9);
        assert_eq!(lifetime_cost(&EnergySnapshot::default(), 0.329), None);
    }
}
