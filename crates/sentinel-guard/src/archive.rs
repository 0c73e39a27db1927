//! Encrypted content archives.
//!
//! An archive is the item set serialized canonically (sorted by content id)
//! and sealed with AES-256-GCM. The key comes from a [`KeyProvider`] so the
//! pipeline never holds key material beyond the sealing call. Sealing under
//! an existing snapshot id replaces the prior archive.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{params, Connection, OptionalExtension};

use sentinel_core::{ContentItem, Result, SentinelError, SnapshotId};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Source of the archive encryption key.
pub trait KeyProvider {
    /// The 256-bit key, or [`SentinelError::Encryption`] when unavailable.
    fn archive_key(&self) -> Result<[u8; KEY_LEN]>;
}

/// Reads a base64-encoded key from an environment variable.
#[derive(Clone, Debug)]
pub struct EnvKeyProvider {
    var: String,
}

impl EnvKeyProvider {
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl KeyProvider for EnvKeyProvider {
    fn archive_key(&self) -> Result<[u8; KEY_LEN]> {
        let raw = std::env::var(&self.var).map_err(|_| {
            SentinelError::Encryption(format!("archive key env var {} not set", self.var))
        })?;
        let decoded = BASE64
            .decode(raw.trim())
            .map_err(|_| SentinelError::Encryption("archive key is not valid base64".into()))?;
        decoded.try_into().map_err(|_| {
            SentinelError::Encryption(format!("archive key must be {KEY_LEN} bytes"))
        })
    }
}

/// Fixed key, for tests and local tooling.
#[derive(Clone, Debug)]
pub struct FixedKeyProvider(pub [u8; KEY_LEN]);

impl KeyProvider for FixedKeyProvider {
    fn archive_key(&self) -> Result<[u8; KEY_LEN]> {
        Ok(self.0)
    }
}

/// A sealed archive, as persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedArchive {
    /// Identifier; sealing again under the same id replaces the archive.
    pub snapshot_id: SnapshotId,
    /// Random per-seal nonce.
    pub nonce: Vec<u8>,
    /// AEAD ciphertext (tag appended).
    pub ciphertext: Vec<u8>,
    /// When the archive was sealed.
    pub created_at: DateTime<Utc>,
}

/// Serialize and encrypt an item set.
///
/// Items are sorted by id before serialization so the plaintext is
/// independent of caller iteration order.
pub fn seal(
    snapshot_id: SnapshotId,
    items: &[ContentItem],
    keys: &dyn KeyProvider,
) -> Result<EncryptedArchive> {
    let mut sorted: Vec<&ContentItem> = items.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    let plaintext = serde_json::to_vec(&sorted)
        .map_err(|e| SentinelError::Encryption(format!("archive serialization failed: {e}")))?;

    let key = keys.archive_key()?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| SentinelError::Encryption("bad archive key length".into()))?;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_ref())
        .map_err(|_| SentinelError::Encryption("archive encryption failed".into()))?;

    Ok(EncryptedArchive {
        snapshot_id,
        nonce: nonce_bytes.to_vec(),
        ciphertext,
        created_at: Utc::now(),
    })
}

/// Decrypt and deserialize an archive.
pub fn open(archive: &EncryptedArchive, keys: &dyn KeyProvider) -> Result<Vec<ContentItem>> {
    let key = keys.archive_key()?;
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|_| SentinelError::Encryption("bad archive key length".into()))?;
    if archive.nonce.len() != NONCE_LEN {
        return Err(SentinelError::Encryption("bad archive nonce length".into()));
    }
    let nonce = Nonce::from_slice(&archive.nonce);
    let plaintext = cipher
        .decrypt(nonce, archive.ciphertext.as_ref())
        .map_err(|_| SentinelError::Encryption("archive decryption failed".into()))?;
    serde_json::from_slice(&plaintext)
        .map_err(|e| SentinelError::Encryption(format!("archive deserialization failed: {e}")))
}

/// Archive persistence. One row per snapshot id.
pub struct ArchiveRepo;

impl ArchiveRepo {
    /// Insert or replace the archive for its snapshot id.
    pub fn upsert(conn: &Connection, archive: &EncryptedArchive) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO archives (snapshot_id, nonce, ciphertext, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(snapshot_id) DO UPDATE SET
                 nonce = excluded.nonce,
                 ciphertext = excluded.ciphertext,
                 created_at = excluded.created_at",
            params![
                archive.snapshot_id.as_str(),
                archive.nonce,
                archive.ciphertext,
                archive.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch an archive by snapshot id.
    pub fn get(conn: &Connection, snapshot_id: &SnapshotId) -> Result<Option<EncryptedArchive>> {
        conn.query_row(
            "SELECT snapshot_id, nonce, ciphertext, created_at
             FROM archives WHERE snapshot_id = ?1",
            params![snapshot_id.as_str()],
            |row| {
                let created_at: String = row.get(3)?;
                Ok(EncryptedArchive {
                    snapshot_id: SnapshotId::from(row.get::<_, String>(0)?),
                    nonce: row.get(1)?,
                    ciphertext: row.get(2)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_default(),
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sentinel_core::{ContentBody, ContentId, ContentKind, Sentiment};
    use sentinel_store::run_migrations;

    fn item(id: &str) -> ContentItem {
        ContentItem {
            id: ContentId::from(id),
            kind: ContentKind::Post,
            language: "en".into(),
            sentiment: Sentiment::Neutral,
            body: ContentBody::Text(format!("body of {id}")),
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    fn keys() -> FixedKeyProvider {
        FixedKeyProvider([7u8; KEY_LEN])
    }

    #[test]
    fn seal_then_open_recovers_the_item_set() {
        let items = vec![item("b"), item("a")];
        let archive = seal(SnapshotId::new(), &items, &keys()).unwrap();
        let opened = open(&archive, &keys()).unwrap();
        // canonical order, not caller order
        assert_eq!(opened.len(), 2);
        assert_eq!(opened[0].id.as_str(), "a");
        assert_eq!(opened[1].id.as_str(), "b");
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let archive = seal(SnapshotId::new(), &[item("a")], &keys()).unwrap();
        let wrong = FixedKeyProvider([9u8; KEY_LEN]);
        assert_matches!(open(&archive, &wrong), Err(SentinelError::Encryption(_)));
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let mut archive = seal(SnapshotId::new(), &[item("a")], &keys()).unwrap();
        archive.ciphertext[0] ^= 0xff;
        assert_matches!(open(&archive, &keys()), Err(SentinelError::Encryption(_)));
    }

    #[test]
    fn missing_env_key_is_an_encryption_error() {
        let provider = EnvKeyProvider::new("SENTINEL_TEST_KEY_THAT_IS_NOT_SET");
        assert_matches!(provider.archive_key(), Err(SentinelError::Encryption(_)));
    }

    #[test]
    fn repo_upsert_replaces_prior_snapshot() {
        let conn = Connection::open_in_memory().unwrap();
        let _ = run_migrations(&conn).unwrap();

        let id = SnapshotId::new();
        let first = seal(id.clone(), &[item("a")], &keys()).unwrap();
        ArchiveRepo::upsert(&conn, &first).unwrap();
        let second = seal(id.clone(), &[item("a"), item("b")], &keys()).unwrap();
        ArchiveRepo::upsert(&conn, &second).unwrap();

        let stored = ArchiveRepo::get(&conn, &id).unwrap().unwrap();
        assert_eq!(stored.ciphertext, second.ciphertext);
        let opened = open(&stored, &keys()).unwrap();
        assert_eq!(opened.len(), 2);
    }
}
