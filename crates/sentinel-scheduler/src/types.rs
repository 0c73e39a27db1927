//! Schedule entry model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sentinel_core::{ContentId, EntryId, Platform};

/// Lifecycle state of a schedule entry.
///
/// ```text
/// pending → due → published
///               ↘ failed                (non-retryable, manual revive)
///               ↘ pending (retry, bounded) → skipped
/// ```
///
/// `published`, `skipped`, and `failed` require an explicit reschedule to
/// leave; only `pending` and `due` count as active.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Planned, awaiting its slot.
    Pending,
    /// Handed to a publish consumer.
    Due,
    /// Publish succeeded; terminal.
    Published,
    /// Non-retryable failure; revivable only by reschedule.
    Failed,
    /// Retry bound exhausted; revivable only by reschedule.
    Skipped,
}

impl EntryState {
    /// Stable string form used in SQL.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Due => "due",
            Self::Published => "published",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "due" => Some(Self::Due),
            "published" => Some(Self::Published),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    /// Whether the entry still occupies its (content, platform) slot.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Due)
    }
}

/// A planned publish action binding one item to one platform and time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    /// Entry identifier.
    pub id: EntryId,
    /// The item to publish.
    pub content_id: ContentId,
    /// Target platform.
    pub platform: Platform,
    /// When the entry becomes due.
    pub planned_at: DateTime<Utc>,
    /// Lifecycle state.
    pub state: EntryState,
    /// Failed publish attempts so far.
    pub attempts: u32,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

/// Result of one publish attempt, reported back by the publisher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The platform call succeeded and a record was written.
    Published,
    /// The call failed; `retryable` distinguishes transport faults from
    /// configuration-class failures that retrying cannot fix.
    Failed {
        /// Whether the backoff policy may retry this entry.
        retryable: bool,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
