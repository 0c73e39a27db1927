//! Error taxonomy for the Sentinel pipeline.
//!
//! A single [`SentinelError`] enum covers every failure class the pipeline
//! can surface. The variants divide into:
//!
//! - client faults, rejected and never retried: [`SentinelError::Validation`],
//!   [`SentinelError::Policy`], [`SentinelError::Duplicate`],
//!   [`SentinelError::Authentication`]
//! - transient faults consumed by the scheduler's backoff:
//!   [`SentinelError::TransientPublish`]
//! - fatal faults scoped to one call: [`SentinelError::Encryption`]
//! - the store-wide invalidation signal: [`SentinelError::Wiped`]
//!
//! Per-item failures are collected by batch callers; none of these aborts
//! a batch on its own.

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Every failure class the pipeline can surface.
#[derive(Debug, Error)]
pub enum SentinelError {
    /// Malformed request or record. Rejected, never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Content blocked by its security verdict.
    #[error("policy refused content {content_id}: {reason}")]
    Policy {
        /// The blocked content item.
        content_id: String,
        /// Why the gate refused it.
        reason: String,
    },

    /// An active entry already exists for this (content, platform) pair.
    ///
    /// Carries the existing entry's ID so callers can treat the call as an
    /// idempotent no-op.
    #[error("duplicate schedule for content {content_id} on {platform} (existing entry {existing})")]
    Duplicate {
        /// The content item.
        content_id: String,
        /// The target platform.
        platform: String,
        /// ID of the already-active entry.
        existing: String,
    },

    /// Simulated transport fault. Retried per the scheduler's backoff.
    #[error("transient publish failure on {platform}: {message}")]
    TransientPublish {
        /// The platform whose endpoint faulted.
        platform: String,
        /// Fault description.
        message: String,
    },

    /// Archive encryption or decryption failed. Fatal to that call only.
    #[error("encryption failure: {0}")]
    Encryption(String),

    /// Credential missing, invalid, or expired. Never silently retried.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The kill switch fired; the store epoch has advanced.
    #[error("store has been wiped; operation aborted")]
    Wiped,

    /// SQLite error from the storage layer.
    #[error("storage error: {0}")]
    Persistence(#[from] rusqlite::Error),

    /// Connection pool exhausted or unavailable.
    #[error("connection pool error: {0}")]
    Pool(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SentinelError {
    /// Whether a caller may retry the failed operation.
    ///
    /// Only simulated transport faults are retryable; everything else is
    /// either a client fault or a terminal condition.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientPublish { .. })
    }

    /// Whether the fault is attributable to the caller (HTTP 4xx).
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Policy { .. }
                | Self::Duplicate { .. }
                | Self::Authentication(_)
        )
    }

    /// Build a policy refusal for a content item.
    pub fn policy(content_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Policy {
            content_id: content_id.into(),
            reason: reason.into(),
        }
    }

    /// Build a transient publish fault.
    pub fn transient(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientPublish {
            platform: platform.into(),
            message: message.into(),
        }
    }
}

impl From<r2d2::Error> for SentinelError {
    fn from(e: r2d2::Error) -> Self {
        Self::Pool(e.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_faults_are_retryable() {
        assert!(SentinelError::transient("twitter", "socket reset").is_retryable());
        assert!(!SentinelError::Validation("bad".into()).is_retryable());
        assert!(!SentinelError::Wiped.is_retryable());
        assert!(!SentinelError::Encryption("no key".into()).is_retryable());
    }

    #[test]
    fn client_fault_classification() {
        assert!(SentinelError::policy("c1", "quarantined").is_client_fault());
        assert!(SentinelError::Authentication("expired".into()).is_client_fault());
        assert!(!SentinelError::Encryption("no key".into()).is_client_fault());
        assert!(!SentinelError::Wiped.is_client_fault());
    }

    #[test]
    fn duplicate_display_names_the_existing_entry() {
        let err = SentinelError::Duplicate {
            content_id: "c1".into(),
            platform: "twitter".into(),
            existing: "e9".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("c1"));
        assert!(msg.contains("e9"));
    }

    #[test]
    fn policy_display() {
        let err = SentinelError::policy("c7", "quarantined at screen time");
        assert_eq!(
            err.to_string(),
            "policy refused content c7: quarantined at screen time"
        );
    }
}
