//! The kill switch.
//!
//! Erasure order matters: the store epoch advances first, so any writer
//! racing the switch aborts with a wipe error instead of recreating rows,
//! and only then are the generated content files removed. The store keeps
//! its `wiped_at` marker; everything else is gone.

use std::path::Path;

use serde::Serialize;
use tracing::warn;

use sentinel_core::Result;
use sentinel_store::{Store, WipeReport};

/// What the switch erased.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KillReport {
    /// Row counts erased from the store.
    pub wipe: WipeReport,
    /// Generated content files removed from disk.
    pub content_files_removed: usize,
}

/// Erase all pipeline state: store rows first, then content files.
///
/// Idempotence is intentional in one direction only: a second invocation
/// fails with a wipe error rather than reporting a successful no-op, so
/// operators can tell the first pull from a repeat.
pub fn kill_switch(store: &Store, content_dir: &Path) -> Result<KillReport> {
    let wipe = store.invalidate_and_erase()?;
    let content_files_removed = remove_content_files(content_dir)?;
    warn!(
        verdicts = wipe.verdicts,
        alerts = wipe.alerts,
        schedule_entries = wipe.schedule_entries,
        publish_records = wipe.publish_records,
        content_files_removed,
        "kill switch engaged"
    );
    Ok(KillReport {
        wipe,
        content_files_removed,
    })
}

/// Remove every regular file under `dir` (one level; the generator writes a
/// flat layout). A missing directory counts as zero files.
fn remove_content_files(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
