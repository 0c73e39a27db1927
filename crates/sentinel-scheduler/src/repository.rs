//! Schedule entry persistence.
//!
//! Stateless; every method takes `&Connection` so the service composes
//! them inside one store transaction. The partial unique index on
//! `(content_id, platform)` over active states enforces the one-active-slot
//! rule at the storage layer as well.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use sentinel_core::{ContentId, EntryId, Platform, Result};

use crate::types::{EntryState, ScheduleEntry};

const COLUMNS: &str = "id, content_id, platform, planned_at, state, attempts, created_at, updated_at";

/// Schedule entry repository.
pub struct ScheduleRepo;

impl ScheduleRepo {
    /// Insert a new entry.
    pub fn insert(conn: &Connection, entry: &ScheduleEntry) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO schedule_entries
             (id, content_id, platform, planned_at, state, attempts, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                entry.id.as_str(),
                entry.content_id.as_str(),
                entry.platform.as_str(),
                entry.planned_at.to_rfc3339(),
                entry.state.as_str(),
                entry.attempts,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch one entry.
    pub fn get(conn: &Connection, id: &EntryId) -> Result<Option<ScheduleEntry>> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM schedule_entries WHERE id = ?1"),
            params![id.as_str()],
            map_entry,
        )
        .optional()
        .map_err(Into::into)
    }

    /// The active (pending/due) entry for a (content, platform) pair, if any.
    pub fn active_for(
        conn: &Connection,
        content_id: &ContentId,
        platform: Platform,
    ) -> Result<Option<ScheduleEntry>> {
        conn.query_row(
            &format!(
                "SELECT {COLUMNS} FROM schedule_entries
                 WHERE content_id = ?1 AND platform = ?2 AND state IN ('pending', 'due')"
            ),
            params![content_id.as_str(), platform.as_str()],
            map_entry,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Number of active entries on one platform, used for cadence slotting.
    pub fn count_active_on(conn: &Connection, platform: Platform) -> Result<i64> {
        conn.query_row(
            "SELECT COUNT(*) FROM schedule_entries
             WHERE platform = ?1 AND state IN ('pending', 'due')",
            params![platform.as_str()],
            |row| row.get(0),
        )
        .map_err(Into::into)
    }

    /// Claim every pending entry with `planned_at <= now`: transition it to
    /// `due` and return it. Ordering is planned time ascending, ties broken
    /// by platform name.
    ///
    /// Run inside a write transaction, the select and the state flips are
    /// atomic, so a second claim pass sees nothing to take.
    pub fn claim_due(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<ScheduleEntry>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM schedule_entries
             WHERE state = 'pending' AND planned_at <= ?1
             ORDER BY planned_at ASC, platform ASC"
        ))?;
        let mut entries = stmt
            .query_map(params![now.to_rfc3339()], map_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for entry in &mut entries {
            entry.state = EntryState::Due;
            entry.updated_at = now;
            Self::persist_transition(conn, entry)?;
        }
        Ok(entries)
    }

    /// Persist a state/attempts/planned_at change.
    pub fn persist_transition(conn: &Connection, entry: &ScheduleEntry) -> Result<()> {
        let _ = conn.execute(
            "UPDATE schedule_entries
             SET state = ?2, attempts = ?3, planned_at = ?4, updated_at = ?5
             WHERE id = ?1",
            params![
                entry.id.as_str(),
                entry.state.as_str(),
                entry.attempts,
                entry.planned_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All entries, planned time ascending.
    pub fn list(conn: &Connection) -> Result<Vec<ScheduleEntry>> {
        let mut stmt = stmt_ordered(conn, "1 = 1")?;
        let entries = stmt
            .query_map([], map_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn stmt_ordered<'c>(
    conn: &'c Connection,
    predicate: &str,
) -> Result<rusqlite::Statement<'c>> {
    conn.prepare(&format!(
        "SELECT {COLUMNS} FROM schedule_entries
         WHERE {predicate}
         ORDER BY planned_at ASC, platform ASC"
    ))
    .map_err(Into::into)
}

fn map_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScheduleEntry> {
    let platform: String = row.get(2)?;
    let planned_at: String = row.get(3)?;
    let state: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(ScheduleEntry {
        id: EntryId::from(row.get::<_, String>(0)?),
        content_id: ContentId::from(row.get::<_, String>(1)?),
        platform: Platform::from_str_opt(&platform)
            .ok_or_else(|| bad_column(2, format!("unknown platform {platform:?}")))?,
        planned_at: parse_ts(3, &planned_at)?,
        state: EntryState::from_str_opt(&state)
            .ok_or_else(|| bad_column(4, format!("unknown entry state {state:?}")))?,
        attempts: row.get(5)?,
        created_at: parse_ts(6, &created_at)?,
        updated_at: parse_ts(7, &updated_at)?,
    })
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| bad_column(idx, format!("bad timestamp {raw:?}: {err}")))
}

fn bad_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
