//! Screening verdict and alert record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sentinel_core::ContentId;

/// Classification produced by a screening pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictStatus {
    /// No deny-term matches.
    Clean,
    /// Matches at or above the flag threshold, below the quarantine bar.
    Flagged,
    /// Matches above the quarantine threshold, or a critical term hit.
    Quarantined,
}

impl VerdictStatus {
    /// Stable string form used in SQL.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Flagged => "flagged",
            Self::Quarantined => "quarantined",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "clean" => Some(Self::Clean),
            "flagged" => Some(Self::Flagged),
            "quarantined" => Some(Self::Quarantined),
            _ => None,
        }
    }

    /// Whether this status blocks downstream scheduling.
    #[must_use]
    pub fn blocks_scheduling(self) -> bool {
        matches!(self, Self::Quarantined)
    }
}

/// Latest screening result for one content item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityVerdict {
    /// The screened item.
    pub content_id: ContentId,
    /// Classification.
    pub status: VerdictStatus,
    /// Matched terms that produced the classification.
    pub reasons: Vec<String>,
    /// When the pass ran.
    pub scanned_at: DateTime<Utc>,
}

/// One durable entry in the append-only alert log.
///
/// `id` is assigned by the store and is strictly increasing, so log order
/// is recoverable even when two alerts share a timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    /// Store-assigned sequence number.
    pub id: i64,
    /// The item the alert concerns.
    pub content_id: ContentId,
    /// Human-readable description of the hit.
    pub message: String,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
