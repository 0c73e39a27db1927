//! Verdict and alert persistence.
//!
//! Stateless repositories; every method takes `&Connection` so callers
//! compose them inside a single store transaction.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use sentinel_core::{ContentId, Result};

use crate::types::{AlertRecord, SecurityVerdict, VerdictStatus};

/// Verdict repository. One row per content id, latest pass wins.
pub struct VerdictRepo;

impl VerdictRepo {
    /// Upsert the latest verdict for an item.
    pub fn upsert(conn: &Connection, verdict: &SecurityVerdict) -> Result<()> {
        let reasons = serde_json::to_string(&verdict.reasons)?;
        let _ = conn.execute(
            "INSERT INTO verdicts (content_id, status, reasons, scanned_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(content_id) DO UPDATE SET
                 status = excluded.status,
                 reasons = excluded.reasons,
                 scanned_at = excluded.scanned_at",
            params![
                verdict.content_id.as_str(),
                verdict.status.as_str(),
                reasons,
                verdict.scanned_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Latest verdict for an item, if it has ever been screened.
    pub fn latest(conn: &Connection, content_id: &ContentId) -> Result<Option<SecurityVerdict>> {
        conn.query_row(
            "SELECT content_id, status, reasons, scanned_at
             FROM verdicts WHERE content_id = ?1",
            params![content_id.as_str()],
            map_verdict,
        )
        .optional()
        .map_err(Into::into)
    }

    /// All verdicts with a given status, in content-id order.
    pub fn by_status(conn: &Connection, status: VerdictStatus) -> Result<Vec<SecurityVerdict>> {
        let mut stmt = conn.prepare(
            "SELECT content_id, status, reasons, scanned_at
             FROM verdicts WHERE status = ?1 ORDER BY content_id ASC",
        )?;
        let rows = stmt
            .query_map(params![status.as_str()], map_verdict)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_verdict(row: &rusqlite::Row<'_>) -> rusqlite::Result<SecurityVerdict> {
    let status: String = row.get(1)?;
    let reasons: String = row.get(2)?;
    let scanned_at: String = row.get(3)?;
    Ok(SecurityVerdict {
        content_id: ContentId::from(row.get::<_, String>(0)?),
        status: VerdictStatus::from_str_opt(&status)
            .ok_or_else(|| bad_column(1, format!("unknown verdict status {status:?}")))?,
        reasons: serde_json::from_str(&reasons)
            .map_err(|err| bad_column(2, format!("bad reasons payload: {err}")))?,
        scanned_at: parse_ts(3, &scanned_at)?,
    })
}

/// Alert repository. Append-only; ordering is the rowid sequence.
pub struct AlertRepo;

impl AlertRepo {
    /// Append one alert and return it with its assigned sequence number.
    pub fn append(
        conn: &Connection,
        content_id: &ContentId,
        message: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<AlertRecord> {
        let _ = conn.execute(
            "INSERT INTO alerts (content_id, message, timestamp) VALUES (?1, ?2, ?3)",
            params![content_id.as_str(), message, timestamp.to_rfc3339()],
        )?;
        Ok(AlertRecord {
            id: conn.last_insert_rowid(),
            content_id: content_id.clone(),
            message: message.to_string(),
            timestamp,
        })
    }

    /// The full log in append order.
    pub fn list(conn: &Connection) -> Result<Vec<AlertRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, content_id, message, timestamp FROM alerts ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], map_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Alerts raised for one item, in append order.
    pub fn for_content(conn: &Connection, content_id: &ContentId) -> Result<Vec<AlertRecord>> {
        let mut stmt = conn.prepare(
            "SELECT id, content_id, message, timestamp FROM alerts
             WHERE content_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![content_id.as_str()], map_alert)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<AlertRecord> {
    let timestamp: String = row.get(3)?;
    Ok(AlertRecord {
        id: row.get(0)?,
        content_id: ContentId::from(row.get::<_, String>(1)?),
        message: row.get(2)?,
        timestamp: parse_ts(3, &timestamp)?,
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

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_store::run_migrations;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    fn verdict(id: &str, status: VerdictStatus) -> SecurityVerdict {
        SecurityVerdict {
            content_id: ContentId::from(id),
            status,
            reasons: vec!["politics".to_string()],
            scanned_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_then_latest_round_trips() {
        let conn = conn();
        let v = verdict("c1", VerdictStatus::Flagged);
        VerdictRepo::upsert(&conn, &v).unwrap();
        let got = VerdictRepo::latest(&conn, &ContentId::from("c1")).unwrap().unwrap();
        assert_eq!(got.status, VerdictStatus::Flagged);
        assert_eq!(got.reasons, ["politics"]);
    }

    #[test]
    fn latest_pass_replaces_the_prior_verdict() {
        let conn = conn();
        VerdictRepo::upsert(&conn, &verdict("c1", VerdictStatus::Quarantined)).unwrap();
        VerdictRepo::upsert(&conn, &verdict("c1", VerdictStatus::Clean)).unwrap();
        let got = VerdictRepo::latest(&conn, &ContentId::from("c1")).unwrap().unwrap();
        assert_eq!(got.status, VerdictStatus::Clean);
    }

    #[test]
    fn unscreened_content_has_no_verdict() {
        let conn = conn();
        assert!(VerdictRepo::latest(&conn, &ContentId::from("ghost")).unwrap().is_none());
    }

    #[test]
    fn by_status_filters_and_orders() {
        let conn = conn();
        VerdictRepo::upsert(&conn, &verdict("b", VerdictStatus::Quarantined)).unwrap();
        VerdictRepo::upsert(&conn, &verdict("a", VerdictStatus::Quarantined)).unwrap();
        VerdictRepo::upsert(&conn, &verdict("c", VerdictStatus::Clean)).unwrap();
        let got = VerdictRepo::by_status(&conn, VerdictStatus::Quarantined).unwrap();
        let ids: Vec<&str> = got.iter().map(|v| v.content_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn alert_sequence_is_strictly_increasing() {
        let conn = conn();
        let ts = Utc::now();
        let a1 = AlertRepo::append(&conn, &ContentId::from("c1"), "first", ts).unwrap();
        let a2 = AlertRepo::append(&conn, &ContentId::from("c2"), "second", ts).unwrap();
        assert!(a2.id > a1.id);

        let log = AlertRepo::list(&conn).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].message, "first");
        assert_eq!(log[1].message, "second");
    }

    #[test]
    fn corrupt_alert_timestamp_is_a_mapping_error() {
        let conn = conn();
        let _ = AlertRepo::append(&conn, &ContentId::from("c1"), "m1", Utc::now()).unwrap();
        let _ = conn
            .execute("UPDATE alerts SET timestamp = 'yesterday-ish'", [])
            .unwrap();
        assert!(AlertRepo::list(&conn).is_err());
    }

    #[test]
    fn corrupt_reasons_payload_is_a_mapping_error() {
        let conn = conn();
        VerdictRepo::upsert(&conn, &verdict("c1", VerdictStatus::Flagged)).unwrap();
        let _ = conn
            .execute("UPDATE verdicts SET reasons = '{not json'", [])
            .unwrap();
        assert!(VerdictRepo::latest(&conn, &ContentId::from("c1")).is_err());
    }

    #[test]
    fn for_content_scopes_to_one_item() {
        let conn = conn();
        let ts = Utc::now();
        let _ = AlertRepo::append(&conn, &ContentId::from("c1"), "m1", ts).unwrap();
        let _ = AlertRepo::append(&conn, &ContentId::from("c2"), "m2", ts).unwrap();
        let got = AlertRepo::for_content(&conn, &ContentId::from("c2")).unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].message, "m2");
    }
}
