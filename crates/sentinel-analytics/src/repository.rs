//! Suggestion persistence.
//!
//! The suggestions table is a snapshot, never patched in place: every
//! recompute deletes the prior set and inserts the new one in the same
//! transaction.

use rusqlite::{params, Connection};

use sentinel_core::{Platform, Result, Sentiment};

use crate::types::{StrategySuggestion, SuggestionKind};

const COLUMNS: &str = "group_key, platform, language, sentiment, score, kind, message, rank";

/// Strategy suggestion repository.
pub struct SuggestionRepo;

impl SuggestionRepo {
    /// Replace the whole suggestion set.
    pub fn replace_all(conn: &Connection, suggestions: &[StrategySuggestion]) -> Result<()> {
        let _ = conn.execute("DELETE FROM suggestions", [])?;
        let mut stmt = conn.prepare(&format!(
            "INSERT INTO suggestions ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
        ))?;
        for s in suggestions {
            let _ = stmt.execute(params![
                s.group_key,
                s.platform.as_str(),
                s.language,
                s.sentiment.as_str(),
                s.score,
                s.kind.as_str(),
                s.message,
                s.rank,
            ])?;
        }
        Ok(())
    }

    /// The current suggestion set, in rank order.
    pub fn list(conn: &Connection) -> Result<Vec<StrategySuggestion>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM suggestions ORDER BY rank ASC"
        ))?;
        let rows = stmt.query_map([], map_suggestion)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

fn map_suggestion(row: &rusqlite::Row<'_>) -> rusqlite::Result<StrategySuggestion> {
    let platform: String = row.get(1)?;
    let sentiment: String = row.get(3)?;
    let kind: String = row.get(5)?;
    Ok(StrategySuggestion {
        group_key: row.get(0)?,
        platform: Platform::from_str_opt(&platform)
            .ok_or_else(|| bad_column(1, format!("unknown platform {platform:?}")))?,
        language: row.get(2)?,
        sentiment: Sentiment::from_str_lossy(&sentiment),
        score: row.get(4)?,
        kind: SuggestionKind::from_str_opt(&kind)
            .ok_or_else(|| bad_column(5, format!("unknown suggestion kind {kind:?}")))?,
        message: row.get(6)?,
        rank: row.get(7)?,
    })
}

fn bad_column(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::group_key;
    use sentinel_store::run_migrations;

    fn suggestion(platform: Platform, language: &str, score: f64, rank: u32) -> StrategySuggestion {
        StrategySuggestion {
            group_key: group_key(platform, language, Sentiment::Neutral),
            platform,
            language: language.to_owned(),
            sentiment: Sentiment::Neutral,
            score,
            kind: SuggestionKind::HighPerforming,
            message: "placeholder".to_owned(),
            rank,
        }
    }

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        let _ = run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn replace_all_is_wholesale() {
        let conn = conn();
        SuggestionRepo::replace_all(
            &conn,
            &[
                suggestion(Platform::Twitter, "english", 2.0, 1),
                suggestion(Platform::Linkedin, "hindi", 1.0, 2),
            ],
        )
        .unwrap();
        assert_eq!(SuggestionRepo::list(&conn).unwrap().len(), 2);

        SuggestionRepo::replace_all(&conn, &[suggestion(Platform::Sanatan, "sanskrit", 3.0, 1)])
            .unwrap();
        let remaining = SuggestionRepo::list(&conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].platform, Platform::Sanatan);
    }

    #[test]
    fn list_returns_rank_order() {
        let conn = conn();
        SuggestionRepo::replace_all(
            &conn,
            &[
                suggestion(Platform::Linkedin, "hindi", 1.0, 2),
                suggestion(Platform::Twitter, "english", 2.0, 1),
            ],
        )
        .unwrap();
        let ranks: Vec<u32> = SuggestionRepo::list(&conn)
            .unwrap()
            .into_iter()
            .map(|s| s.rank)
            .collect();
        assert_eq!(ranks, vec![1, 2]);
    }

    #[test]
    fn corrupt_platform_column_is_a_mapping_error() {
        let conn = conn();
        SuggestionRepo::replace_all(&conn, &[suggestion(Platform::Twitter, "english", 2.0, 1)])
            .unwrap();
        let _ = conn
            .execute("UPDATE suggestions SET platform = 'myspace'", [])
            .unwrap();
        assert!(SuggestionRepo::list(&conn).is_err());
    }

    #[test]
    fn replacing_with_empty_clears_the_table() {
        let conn = conn();
        SuggestionRepo::replace_all(&conn, &[suggestion(Platform::Twitter, "english", 2.0, 1)])
            .unwrap();
        SuggestionRepo::replace_all(&conn, &[]).unwrap();
        assert!(SuggestionRepo::list(&conn).unwrap().is_empty());
    }
}
