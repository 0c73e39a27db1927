//! The shared store handle.
//!
//! [`Store`] wraps the connection pool and coordinates the store-wide
//! invalidation epoch. Every durable write runs through [`Store::write`],
//! which opens an immediate-mode transaction, re-reads the epoch while
//! holding the write lock, and aborts with [`SentinelError::Wiped`] if the
//! kill switch has advanced it. Because the epoch check and the commit sit
//! inside the same immediate transaction, a writer racing the kill switch
//! either commits first or observes the bump — never a partial write, and
//! never resurrected state afterward.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use tracing::{info, warn};

use sentinel_core::{Result, SentinelError};

use crate::connection::{self, ConnectionConfig, ConnectionPool, PooledConnection};
use crate::migrations;

/// Counts of erased state, returned by the kill switch.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WipeReport {
    /// Alert rows erased.
    pub alerts: usize,
    /// Verdict rows erased.
    pub verdicts: usize,
    /// Schedule entries erased.
    pub schedule_entries: usize,
    /// Publish records erased.
    pub publish_records: usize,
    /// Suggestion rows erased.
    pub suggestions: usize,
    /// Archive blobs erased.
    pub archives: usize,
}

/// Pooled database handle with wipe-epoch coordination.
pub struct Store {
    pool: ConnectionPool,
    session_epoch: u64,
    invalidated: AtomicBool,
}

impl Store {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path, config: &ConnectionConfig) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| SentinelError::Validation(format!("non-UTF-8 db path: {path:?}")))?;
        let pool = connection::new_file(path_str, config)?;

        let conn = pool.get()?;
        let _ = migrations::run_migrations(&conn)?;
        let session_epoch = read_epoch(&conn)?;
        drop(conn);

        info!(db = path_str, epoch = session_epoch, "store opened");
        Ok(Self {
            pool,
            session_epoch,
            invalidated: AtomicBool::new(false),
        })
    }

    /// The invalidation epoch captured when this handle was opened.
    #[must_use]
    pub fn session_epoch(&self) -> u64 {
        self.session_epoch
    }

    /// Whether this handle has observed a wipe.
    #[must_use]
    pub fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::Acquire)
    }

    /// Borrow a pooled connection for read-only work.
    ///
    /// Reads never epoch-check: after a wipe the tables are simply empty,
    /// and read endpoints return empty collections rather than errors.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.pool.get()?;
        f(&conn)
    }

    /// Run a durable write inside an immediate transaction.
    ///
    /// The epoch is re-read while the write lock is held; if it has
    /// advanced since this handle was opened the closure never runs and
    /// the caller sees [`SentinelError::Wiped`].
    pub fn write<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        if self.is_invalidated() {
            return Err(SentinelError::Wiped);
        }

        let mut conn: PooledConnection = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let epoch = read_epoch(&tx)?;
        if epoch != self.session_epoch {
            self.invalidated.store(true, Ordering::Release);
            warn!(
                session_epoch = self.session_epoch,
                current_epoch = epoch,
                "write refused: store epoch advanced"
            );
            return Err(SentinelError::Wiped);
        }

        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Advance the epoch and erase every mutable table.
    ///
    /// This is the storage half of the kill switch. The epoch bump, the
    /// erasure, and the terminal `wiped_at` marker all commit in one
    /// immediate transaction; afterwards this handle refuses all writes.
    /// A second invocation observes the advanced epoch and fails with
    /// [`SentinelError::Wiped`].
    pub fn invalidate_and_erase(&self) -> Result<WipeReport> {
        if self.is_invalidated() {
            return Err(SentinelError::Wiped);
        }

        let mut conn: PooledConnection = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let epoch = read_epoch(&tx)?;
        if epoch != self.session_epoch {
            self.invalidated.store(true, Ordering::Release);
            return Err(SentinelError::Wiped);
        }

        let report = WipeReport {
            alerts: tx.execute("DELETE FROM alerts", [])?,
            verdicts: tx.execute("DELETE FROM verdicts", [])?,
            schedule_entries: tx.execute("DELETE FROM schedule_entries", [])?,
            publish_records: tx.execute("DELETE FROM publish_records", [])?,
            suggestions: tx.execute("DELETE FROM suggestions", [])?,
            archives: tx.execute("DELETE FROM archives", [])?,
        };

        let _ = tx.execute(
            "UPDATE wipe_state SET epoch = epoch + 1, wiped_at = ?1 WHERE id = 1",
            [chrono::Utc::now().to_rfc3339()],
        )?;

        tx.commit()?;
        self.invalidated.store(true, Ordering::Release);
        info!(?report, "store erased, epoch advanced");
        Ok(report)
    }
}

fn read_epoch(conn: &Connection) -> Result<u64> {
    let epoch: u64 = conn.query_row("SELECT epoch FROM wipe_state WHERE id = 1", [], |row| {
        row.get(0)
    })?;
    Ok(epoch)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn open_store(dir: &tempfile::TempDir) -> Store {
        Store::open(&dir.path().join("test.db"), &ConnectionConfig::default()).unwrap()
    }

    #[test]
    fn open_runs_migrations_and_reads_epoch() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        assert_eq!(store.session_epoch(), 0);
        assert!(!store.is_invalidated());
    }

    #[test]
    fn writes_commit_through_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let _ = store
            .write(|tx| {
                let _ = tx.execute(
                    "INSERT INTO alerts (content_id, message, timestamp) VALUES ('c1', 'm', 't')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let count: u32 = store
            .read(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn erase_empties_tables_and_blocks_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let _ = store
            .write(|tx| {
                let _ = tx.execute(
                    "INSERT INTO alerts (content_id, message, timestamp) VALUES ('c1', 'm', 't')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        let report = store.invalidate_and_erase().unwrap();
        assert_eq!(report.alerts, 1);
        assert!(store.is_invalidated());

        let err = store.write(|_| Ok(())).unwrap_err();
        assert_matches!(err, SentinelError::Wiped);
    }

    #[test]
    fn second_handle_observes_the_wipe() {
        let dir = tempfile::tempdir().unwrap();
        let store_a = open_store(&dir);
        let store_b = open_store(&dir);

        let _ = store_a.invalidate_and_erase().unwrap();

        // The other handle's next write hits the advanced epoch.
        let err = store_b.write(|_| Ok(())).unwrap_err();
        assert_matches!(err, SentinelError::Wiped);
        assert!(store_b.is_invalidated());
    }

    #[test]
    fn double_wipe_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let _ = store.invalidate_and_erase().unwrap();
        assert_matches!(store.invalidate_and_erase(), Err(SentinelError::Wiped));
    }

    #[test]
    fn reads_survive_the_wipe_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let _ = store.invalidate_and_erase().unwrap();
        let count: u32 = store
            .read(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM alerts", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn wipe_stamps_terminal_marker() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let _ = store.invalidate_and_erase().unwrap();
        let wiped_at: Option<String> = store
            .read(|conn| {
                Ok(conn.query_row("SELECT wiped_at FROM wipe_state WHERE id = 1", [], |row| {
                    row.get(0)
                })?)
            })
            .unwrap();
        assert!(wiped_at.is_some());
    }
}
