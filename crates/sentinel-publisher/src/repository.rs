//! Publish record persistence.
//!
//! One record per schedule entry, and at most one per (content, platform)
//! pair; the table's unique constraint backs the idempotence guarantee.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use sentinel_core::{ContentId, EntryId, Platform, Result, Sentiment};

use crate::platform::EngagementMetrics;

/// Durable proof a schedule entry executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRecord {
    /// The executed entry.
    pub entry_id: EntryId,
    /// The published item.
    pub content_id: ContentId,
    /// Where it went.
    pub platform: Platform,
    /// Denormalized from the item for analytics grouping.
    pub language: String,
    /// Denormalized from the item for analytics grouping.
    pub sentiment: Sentiment,
    /// When the platform call succeeded.
    pub published_at: DateTime<Utc>,
    /// Platform-side post identifier.
    pub external_ref: String,
    /// Engagement numbers reported by the platform.
    pub metrics: EngagementMetrics,
}

const COLUMNS: &str = "schedule_entry_id, content_id, platform, language, sentiment, \
                       published_at, external_ref, metrics";

/// Publish record repository.
pub struct PublishRecordRepo;

impl PublishRecordRepo {
    /// Insert a new record. Fails on a second record for the same entry or
    /// the same (content, platform) pair.
    pub fn insert(conn: &Connection, record: &PublishRecord) -> Result<()> {
        let metrics = serde_json::to_string(&record.metrics)?;
        let _ = conn.execute(
            &format!("INSERT INTO publish_records ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                record.entry_id.as_str(),
                record.content_id.as_str(),
                record.platform.as_str(),
                record.language,
                record.sentiment.as_str(),
                record.published_at.to_rfc3339(),
                record.external_ref,
                metrics,
            ],
        )?;
        Ok(())
    }

    /// The record for a (content, platform) pair, if the pair ever published.
    pub fn for_pair(
        conn: &Connection,
        content_id: &ContentId,
        platform: Platform,
    ) -> Result<Option<PublishRecord>> {
        conn.query_row(
            &format!(
                "SELECT {COLUMNS} FROM publish_records
                 WHERE content_id = ?1 AND platform = ?2"
            ),
            params![content_id.as_str(), platform.as_str()],
            map_record,
        )
        .optional()
        .map_err(Into::into)
    }

    /// The record for one schedule entry.
    pub fn for_entry(conn: &Connection, entry_id: &EntryId) -> Result<Option<PublishRecord>> {
        conn.query_row(
            &format!("SELECT {COLUMNS} FROM publish_records WHERE schedule_entry_id = ?1"),
            params![entry_id.as_str()],
            map_record,
        )
        .optional()
        .map_err(Into::into)
    }

    /// All records, publish time ascending.
    pub fn list(conn: &Connection) -> Result<Vec<PublishRecord>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM publish_records ORDER BY published_at ASC, schedule_entry_id ASC"
        ))?;
        let rows = stmt
            .query_map([], map_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<PublishRecord> {
    let platform: String = row.get(2)?;
    let sentiment: String = row.get(4)?;
    let published_at: String = row.get(5)?;
    let metrics: String = row.get(7)?;
    Ok(PublishRecord {
        entry_id: EntryId::from(row.get::<_, String>(0)?),
        content_id: ContentId::from(row.get::<_, String>(1)?),
        platform: Platform::from_str_opt(&platform)
            .ok_or_else(|| bad_column(2, format!("unknown platform {platform:?}")))?,
        language: row.get(3)?,
        sentiment: Sentiment::from_str_lossy(&sentiment),
        published_at: DateTime::parse_from_rfc3339(&published_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| bad_column(5, format!("bad timestamp {published_at:?}: {err}")))?,
        external_ref: row.get(6)?,
        metrics: serde_json::from_str(&metrics)
            .map_err(|err| bad_column(7, format!("bad metrics payload: {err}")))?,
    })
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

    fn record(entry: &str, content: &str, platform: Platform) -> PublishRecord {
        PublishRecord {
            entry_id: EntryId::from(entry),
            content_id: ContentId::from(content),
            platform,
            language: "en".into(),
            sentiment: Sentiment::Uplifting,
            published_at: Utc::now(),
            external_ref: format!("{platform}-ref"),
            metrics: EngagementMetrics {
                likes: 10,
                views: 100,
                ..EngagementMetrics::default()
            },
        }
    }

    #[test]
    fn insert_then_fetch_round_trips() {
        let conn = conn();
        let r = record("e1", "c1", Platform::Twitter);
        PublishRecordRepo::insert(&conn, &r).unwrap();

        let by_pair = PublishRecordRepo::for_pair(&conn, &r.content_id, r.platform)
            .unwrap()
            .unwrap();
        assert_eq!(by_pair.metrics.likes, 10);
        assert_eq!(by_pair.sentiment, Sentiment::Uplifting);

        let by_entry = PublishRecordRepo::for_entry(&conn, &r.entry_id).unwrap().unwrap();
        assert_eq!(by_entry, by_pair);
    }

    #[test]
    fn pair_uniqueness_is_enforced() {
        let conn = conn();
        PublishRecordRepo::insert(&conn, &record("e1", "c1", Platform::Twitter)).unwrap();
        let result = PublishRecordRepo::insert(&conn, &record("e2", "c1", Platform::Twitter));
        assert!(result.is_err());
        // same content, different platform is fine
        PublishRecordRepo::insert(&conn, &record("e3", "c1", Platform::Linkedin)).unwrap();
    }

    #[test]
    fn empty_store_lists_nothing() {
        let conn = conn();
        assert!(PublishRecordRepo::list(&conn).unwrap().is_empty());
    }

    #[test]
    fn corrupt_metrics_payload_is_a_mapping_error() {
        let conn = conn();
        PublishRecordRepo::insert(&conn, &record("e1", "c1", Platform::Twitter)).unwrap();
        let _ = conn
            .execute("UPDATE publish_records SET metrics = '{broken'", [])
            .unwrap();
        assert!(PublishRecordRepo::list(&conn).is_err());
    }
}
