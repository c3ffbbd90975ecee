//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use scan_lib::models::DeviceRecord;
use scan_lib::report::CostSeries;
use scan_lib::scanner::ScanSummary;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

#[derive(Tabled, Serialize)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Power (W)")]
    power_w: String,
    #[tabled(rename = "Total (kWh)")]
    total_kwh: String,
    #[tabled(rename = "Cost (EUR)")]
    cost_eur: String,
    #[tabled(rename = "RSSI")]
    rssi: String,
}

impl DeviceRow {
    fn from_record(record: &DeviceRecord, price_eur_per_kwh: f64) -> Self {
        let cost = scan_lib::cost::lifetime_cost(&record.energy, price_eur_per_kwh);
        Self {
            name: record.display_name(),
            ip: record.host.clone(),
            mac: opt_text(&record.mac),
            power_w: opt_number(record.energy.power_w, 0),
            total_kwh: opt_number(record.energy.total_kwh, 3),
            cost_eur: opt_number(cost, 2),
            rssi: opt_number(record.wifi_rssi, 0),
        }
    }
}

/// Print the devices found in one scan cycle
pub fn print_devices(summary: &ScanSummary, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if summary.devices.is_empty() {
                println!("{}", "No devices found".yellow());
                return;
            }
            let rows: Vec<DeviceRow> = summary
                .devices
                .iter()
                .map(|record| DeviceRow::from_record(record, summary.price_eur_per_kwh))
                .collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&summary.devices) {
                println!("{}", json);
            }
        }
    }
}

/// Print the aggregate line for one scan cycle
pub fn print_summary(summary: &ScanSummary) {
    println!(
        "{} devices, {} EUR total at {} EUR/kWh ({} entries logged, {} failed, {:.1}s)",
        summary.device_count().to_string().bold(),
        format!("{:.2}", summary.total_cost_eur).bold(),
        summary.price_eur_per_kwh,
        summary.appended,
        summary.append_errors,
        summary.elapsed.as_secs_f64()
    );
}

#[derive(Tabled)]
struct SeriesRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Entries")]
    entries: usize,
    #[tabled(rename = "First")]
    first: String,
    #[tabled(rename = "Last")]
    last: String,
    #[tabled(rename = "Cost (EUR)")]
    cost_eur: String,
}

/// Print per-device cost series
pub fn print_series(series: &[CostSeries], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if series.is_empty() {
                println!("{}", "No plottable cost data".yellow());
                return;
            }
            let rows: Vec<SeriesRow> = series
                .iter()
                .map(|s| SeriesRow {
                    device: s.label.clone(),
                    entries: s.points.len(),
                    first: s.points.first().map(|p| p.ts.clone()).unwrap_or_default(),
                    last: s.points.last().map(|p| p.ts.clone()).unwrap_or_default(),
                    cost_eur: s
                        .points
                        .last()
                        .map(|p| format!("{:.2}", p.cost_eur))
                        .unwrap_or_default(),
                })
                .collect();
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(series) {
                println!("{}", json);
            }
        }
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

fn opt_text(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "N/A".to_string())
}

fn opt_number(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opt_number_formats_and_falls_back() {
        assert_eq!(opt_number(Some(1.2345), 2), "1.23");
        assert_eq!(opt_number(Some(9.0), 0), "9");
        assert_eq!(opt_number(None, 2), "N/A");
    }

    #[test]
    fn test_opt_text_falls_back() {
        assert_eq!(opt_text(&Some("ab".into())), "ab");
        assert_eq!(opt_text(&None), "N/A");
    }
}
