//! Device log merge
//!
//! Reconciles two logs believed to describe the same physical device,
//! e.g. histories accumulated on two machines. The resulting entry set
//! is the deduplicated union of both, so the operation is idempotent and
//! safe to repeat after a partial run.

use super::{ts_key, write_log_atomic, DeviceIdentity, DeviceLog, LogEntry, LogStore, StoreError};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Result of a completed file merge
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Path of the merged target document
    pub target: PathBuf,
    /// Entry count after the merge
    pub entries: usize,
    /// Whether the source file was removed
    pub source_deleted: bool,
}

/// Merge `secondary` into `primary` in memory.
///
/// Rules: earliest-known baseline wins; entries are deduplicated by
/// timestamp (an entry with a present cost figure beats one without,
/// otherwise primary's entry is kept) and sorted ascending; identity
/// fields are filled from whichever side has them, primary preferred;
/// schema version is the higher of the two.
///
/// Timestamps are compared by wall clock with offsets dropped. Both
/// logs are assumed to have been written in the same timezone, which
/// lets naive legacy timestamps dedup against RFC 3339 ones.
pub fn merge_logs(primary: &mut DeviceLog, secondary: DeviceLog) {
    primary.schema_version = primary.schema_version.max(secondary.schema_version);

    primary.device.baseline_total_kwh = match (
        primary.device.baseline_total_kwh,
        secondary.device.baseline_total_kwh,
    ) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    fill_identity(&mut primary.device, &secondary.device);

    let mut by_ts: HashMap<String, LogEntry> = HashMap::with_capacity(
        primary.entries.len() + secondary.entries.len(),
    );
    for entry in primary.entries.drain(..) {
        by_ts.insert(ts_key(&entry.ts), entry);
    }
    for entry in secondary.entries {
        let key = ts_key(&entry.ts);
        match by_ts.get(&key) {
            None => {
                by_ts.insert(key, entry);
            }
            // same observation; take the secondary copy only when it
            // carries a cost figure the kept one lacks
            Some(kept)
                if kept.cost_since_first_seen_eur.is_none()
                    && entry.cost_since_first_seen_eur.is_some() =>
            {
                by_ts.insert(key, entry);
            }
            Some(_) => {}
        }
    }

    primary.entries = by_ts.into_values().collect();
    primary.sort_entries();
}

fn fill_identity(primary: &mut DeviceIdentity, secondary: &DeviceIdentity) {
    fn fill(target: &mut Option<String>, source: &Option<String>) {
        if target.is_none() {
            *target = source.clone();
        }
    }

    fill(&mut primary.hostname, &secondary.hostname);
    fill(&mut primary.name, &secondary.name);
    fill(&mut primary.mac, &secondary.mac);
    fill(&mut primary.ip, &secondary.ip);
    fill(&mut primary.module, &secondary.module);
    fill(&mut primary.version, &secondary.version);
}

/// Merge the log at `source` into the log at `target` on disk.
///
/// Preconditions are checked before anything is written: the two paths
/// must differ and the source must exist and parse. The source file is
/// deleted only after the merged target has been written successfully,
/// and only when `delete_source` is set.
pub fn merge_files(
    target: &Path,
    source: &Path,
    delete_source: bool,
) -> Result<MergeOutcome, StoreError> {
    if same_file(target, source) {
        return Err(StoreError::SamePath(target.to_path_buf()));
    }
    if !source.exists() {
        return Err(StoreError::SourceMissing(source.to_path_buf()));
    }

    let store = LogStore::new(source.parent().unwrap_or_else(|| Path::new(".")));
    let source_log = store.load(source)?;

    let target_store = LogStore::new(target.parent().unwrap_or_else(|| Path::new(".")));
    let mut target_log =
        target_store.load_or_new(target, source_log.price_eur_per_kwh_default)?;

    merge_logs(&mut target_log, source_log);
    write_log_atomic(target, &target_log)?;

    let mut source_deleted = false;
    if delete_source {
        match std::fs::remove_file(source) {
            Ok(()) => source_deleted = true,
            Err(e) => warn!(
                source = %source.display(),
                error = %e,
                "Merged target written but source could not be removed"
            ),
        }
    }

    info!(
        target = %target.display(),
        entries = target_log.entries.len(),
        source_deleted,
        "Merge complete"
    );

    Ok(MergeOutcome {
        target: target.to_path_buf(),
        entries: target_log.entries.len(),
        source_deleted,
    })
}

/// Best-effort check that two paths name the same file
fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => false,
    }
}
