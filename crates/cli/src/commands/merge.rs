//! Device log merge maintenance

use crate::output;
use anyhow::{Context, Result};
use scan_lib::store::merge_files;
use std::path::Path;

pub fn run(target: &Path, source: &Path, keep_source: bool) -> Result<()> {
    let outcome = merge_files(target, source, !keep_source)
        .context("Merge failed; the source file was not deleted")?;

    output::print_success(&format!(
        "Merged into {} ({} entries)",
        outcome.target.display(),
        outcome.entries
    ));
    if outcome.source_deleted {
        output::print_info(&format!("Deleted source {}", source.display()));
    }
    Ok(())
}
