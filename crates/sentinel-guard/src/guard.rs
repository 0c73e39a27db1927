//! Screening service.
//!
//! `screen` classifies one item and persists the verdict; when the verdict
//! is flagged or quarantined the alert append commits in the same
//! transaction, so no caller can observe a non-clean verdict without its
//! alert on disk.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use sentinel_core::{ContentItem, Result, SnapshotId};
use sentinel_settings::GuardSettings;
use sentinel_store::Store;

use crate::archive::{self, ArchiveRepo, EncryptedArchive, KeyProvider};
use crate::policy::ScreeningPolicy;
use crate::repository::{AlertRepo, VerdictRepo};
use crate::types::{SecurityVerdict, VerdictStatus};

/// Longest body prefix quoted in an alert message.
const ALERT_EXCERPT_CHARS: usize = 50;

/// Lexical screening and archive sealing over one store.
pub struct SecurityGuard {
    store: Arc<Store>,
    policy: ScreeningPolicy,
    keys: Arc<dyn KeyProvider + Send + Sync>,
}

impl SecurityGuard {
    /// Build a guard from settings.
    pub fn new(
        store: Arc<Store>,
        settings: &GuardSettings,
        keys: Arc<dyn KeyProvider + Send + Sync>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            policy: ScreeningPolicy::from_settings(settings)?,
            keys,
        })
    }

    /// Screen one item, persisting the verdict and any alert atomically.
    pub fn screen(&self, item: &ContentItem) -> Result<SecurityVerdict> {
        let outcome = self.policy.evaluate(item.body.text());
        let verdict = SecurityVerdict {
            content_id: item.id.clone(),
            status: outcome.status,
            reasons: outcome.matches,
            scanned_at: Utc::now(),
        };

        self.store.write(|tx| {
            VerdictRepo::upsert(tx, &verdict)?;
            if verdict.status != VerdictStatus::Clean {
                let message = alert_message(item, &verdict);
                let alert = AlertRepo::append(tx, &item.id, &message, verdict.scanned_at)?;
                warn!(
                    content_id = %item.id,
                    status = verdict.status.as_str(),
                    alert_id = alert.id,
                    "screening hit"
                );
            }
            Ok(())
        })?;

        Ok(verdict)
    }

    /// Screen a batch, returning verdicts in input order.
    pub fn screen_all(&self, items: &[ContentItem]) -> Result<Vec<SecurityVerdict>> {
        let mut verdicts = Vec::with_capacity(items.len());
        for item in items {
            verdicts.push(self.screen(item)?);
        }
        let hits = verdicts
            .iter()
            .filter(|v| v.status != VerdictStatus::Clean)
            .count();
        info!(screened = items.len(), hits, "screening pass complete");
        Ok(verdicts)
    }

    /// Seal an item set under `snapshot_id`, replacing any prior archive
    /// with that id.
    pub fn archive(
        &self,
        snapshot_id: SnapshotId,
        items: &[ContentItem],
    ) -> Result<EncryptedArchive> {
        let sealed = archive::seal(snapshot_id, items, self.keys.as_ref())?;
        self.store.write(|tx| ArchiveRepo::upsert(tx, &sealed))?;
        info!(
            snapshot_id = %sealed.snapshot_id,
            items = items.len(),
            "archive sealed"
        );
        Ok(sealed)
    }

    /// Decrypt a previously sealed archive.
    pub fn open_archive(&self, snapshot_id: &SnapshotId) -> Result<Option<Vec<ContentItem>>> {
        let stored = self.store.read(|conn| ArchiveRepo::get(conn, snapshot_id))?;
        match stored {
            Some(sealed) => Ok(Some(archive::open(&sealed, self.keys.as_ref())?)),
            None => Ok(None),
        }
    }
}

fn alert_message(item: &ContentItem, verdict: &SecurityVerdict) -> String {
    let excerpt: String = item
        .body
        .text()
        .unwrap_or_default()
        .chars()
        .take(ALERT_EXCERPT_CHARS)
        .collect();
    format!(
        "{} {} content detected in {} {}: {excerpt}...",
        capitalized(verdict.status.as_str()),
        verdict.reasons.join(", "),
        item.kind.as_str(),
        item.id
    )
}

fn capitalized(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
