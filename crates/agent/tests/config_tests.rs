//! Agent configuration tests
//!
//! The config module is private to the binary, so these tests exercise
//! the same environment-driven config shape through the config crate
//! directly, pinning the variable names the agent documents. Each test
//! uses its own prefix so parallel tests cannot see each other's
//! variables.

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize)]
struct TestConfig {
    data_dir: Option<PathBuf>,
    scan_interval_secs: Option<u64>,
    probe_concurrency: Option<usize>,
}

fn load_with_env(prefix: &str, vars: &[(&str, &str)]) -> TestConfig {
    for (key, value) in vars {
        std::env::set_var(key, value);
    }
    let config = config::Config::builder()
        .add_source(config::Environment::with_prefix(prefix))
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();
    for (key, _) in vars {
        std::env::remove_var(key);
    }
    config
}

#[test]
fn test_environment_variables_map_to_fields() {
    let config = load_with_env(
        "TAS_CFG_A",
        &[
            ("TAS_CFG_A_DATA_DIR", "/var/lib/tasmota"),
            ("TAS_CFG_A_SCAN_INTERVAL_SECS", "300"),
            ("TAS_CFG_A_PROBE_CONCURRENCY", "64"),
        ],
    );

    assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/tasmota")));
    assert_eq!(config.scan_interval_secs, Some(300));
    assert_eq!(config.probe_concurrency, Some(64));
}

#[test]
fn test_unset_environment_leaves_fields_empty() {
    let config = load_with_env("TAS_CFG_B", &[]);
    assert_eq!(config.data_dir, None);
    assert_eq!(config.scan_interval_secs, None);
    assert_eq!(config.probe_concurrency, None);
}
