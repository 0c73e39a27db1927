//! Retry policy and backoff calculation.
//!
//! Two retry regimes exist in the pipeline:
//!
//! - the **scheduler** pushes a failed entry's `planned_at` out by a linear
//!   backoff so it re-enters the due queue (bounded attempts, then skipped);
//! - the **publisher pool** caps in-flight retry delays exponentially for
//!   transient transport faults within a single batch.
//!
//! Both share the pure calculation helpers here; async sleeping lives with
//! the callers.

use serde::{Deserialize, Serialize};

/// Default attempt bound before an entry goes terminal.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default linear backoff step in seconds.
pub const DEFAULT_BACKOFF_STEP_SECS: i64 = 60;
/// Default cap for exponential in-flight delays in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// Bounded retry parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Attempts allowed before the terminal state (default: 3).
    pub max_attempts: u32,
    /// Linear backoff step in seconds (default: 60).
    pub backoff_step_secs: i64,
    /// Cap for exponential in-flight delays in ms (default: 30000).
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_step_secs: DEFAULT_BACKOFF_STEP_SECS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl RetryPolicy {
    /// Whether another attempt is allowed after `attempts` failures.
    #[must_use]
    pub fn allows(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Capped exponential delay for the in-flight retry loop.
    ///
    /// `min(max_delay, 1000ms * 2^attempt)` — attempt is zero-based.
    #[must_use]
    pub fn exponential_delay_ms(&self, attempt: u32) -> u64 {
        let base: u64 = 1000;
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        base.saturating_mul(factor).min(self.max_delay_ms)
    }
}

/// Linear backoff in seconds for the scheduler's re-queue path.
///
/// The delay grows with the attempt count so repeated failures drift the
/// entry further out instead of hammering the endpoint.
#[must_use]
pub fn linear_backoff_delay(step_secs: i64, attempts: u32) -> i64 {
    step_secs.saturating_mul(i64::from(attempts.max(1)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.backoff_step_secs, 60);
        assert_eq!(p.max_delay_ms, 30_000);
    }

    #[test]
    fn allows_up_to_bound() {
        let p = RetryPolicy::default();
        assert!(p.allows(0));
        assert!(p.allows(2));
        assert!(!p.allows(3));
        assert!(!p.allows(9));
    }

    #[test]
    fn exponential_is_capped() {
        let p = RetryPolicy::default();
        assert_eq!(p.exponential_delay_ms(0), 1000);
        assert_eq!(p.exponential_delay_ms(1), 2000);
        assert_eq!(p.exponential_delay_ms(2), 4000);
        assert_eq!(p.exponential_delay_ms(10), 30_000);
        assert_eq!(p.exponential_delay_ms(63), 30_000);
    }

    #[test]
    fn linear_backoff_grows_with_attempts() {
        assert_eq!(linear_backoff_delay(60, 1), 60);
        assert_eq!(linear_backoff_delay(60, 2), 120);
        assert_eq!(linear_backoff_delay(60, 3), 180);
        // A zero attempt count still backs off one step.
        assert_eq!(linear_backoff_delay(60, 0), 60);
    }

    #[test]
    fn policy_serde_round_trip() {
        let p = RetryPolicy {
            max_attempts: 5,
            backoff_step_secs: 30,
            max_delay_ms: 10_000,
        };
        let json = serde_json::to_string(&p).unwrap();
        let back: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_attempts, 5);
        assert_eq!(back.backoff_step_secs, 30);
    }
}
