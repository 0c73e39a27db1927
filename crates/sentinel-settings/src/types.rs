//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON wire
//! format. Each type implements [`Default`] with production default values,
//! and `#[serde(default)]` allows partial JSON — missing fields get their
//! default value during deserialization.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type for the sentinel pipeline.
///
/// Loaded from `~/.sentinel/settings.json` with defaults applied for
/// missing fields. Environment variables can override specific values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SentinelSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// HTTP serving settings.
    pub server: ServerSettings,
    /// Storage paths and pool tuning.
    pub storage: StorageSettings,
    /// Lexical screening and archive settings.
    pub guard: GuardSettings,
    /// Schedule cadence settings.
    pub scheduler: SchedulerSettings,
    /// Publish batch settings.
    pub publisher: PublisherSettings,
    /// Engagement scoring weights.
    pub analytics: AnalyticsSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for SentinelSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "sentinel".to_string(),
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            guard: GuardSettings::default(),
            scheduler: SchedulerSettings::default(),
            publisher: PublisherSettings::default(),
            analytics: AnalyticsSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl SentinelSettings {
    /// Cross-field sanity checks that per-field parsing cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.guard.quarantine_threshold < self.guard.flag_threshold {
            return Err(SettingsError::InvalidValue(
                "guard.quarantineThreshold must be >= guard.flagThreshold".to_string(),
            ));
        }
        if self.publisher.max_parallel == 0 {
            return Err(SettingsError::InvalidValue(
                "publisher.maxParallel must be >= 1".to_string(),
            ));
        }
        if self.analytics.weight_sum() <= 0.0 {
            return Err(SettingsError::InvalidValue(
                "analytics weights must sum to a positive value".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP serving settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Name of the env var holding the JWT signing secret.
    pub jwt_secret_env: String,
    /// Issued-token lifetime in seconds.
    pub token_ttl_secs: u64,
    /// Email accepted by the login exchange.
    pub login_email: String,
    /// Name of the env var holding the login password.
    pub login_password_env: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret_env: "SENTINEL_JWT_SECRET".to_string(),
            token_ttl_secs: 3600,
            login_email: "publisher@sentinel.local".to_string(),
            login_password_env: "SENTINEL_LOGIN_PASSWORD".to_string(),
        }
    }
}

/// Storage paths and pool tuning.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// SQLite database path.
    pub db_path: String,
    /// Directory holding generated content collections.
    pub content_dir: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// SQLite busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_path: "sentinel.db".to_string(),
            content_dir: "content_ready".to_string(),
            pool_size: 8,
            busy_timeout_ms: 30_000,
        }
    }
}

/// Lexical screening and archive settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardSettings {
    /// Match count at which an item is flagged.
    pub flag_threshold: usize,
    /// Match count above which an item is quarantined.
    pub quarantine_threshold: usize,
    /// Deny terms added on top of the built-in list.
    pub extra_deny_terms: Vec<String>,
    /// Terms that quarantine immediately regardless of count.
    pub extra_critical_terms: Vec<String>,
    /// Name of the env var holding the archive encryption key.
    pub archive_key_env: String,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            flag_threshold: 1,
            quarantine_threshold: 3,
            extra_deny_terms: Vec::new(),
            extra_critical_terms: Vec::new(),
            archive_key_env: "SENTINEL_ARCHIVE_KEY".to_string(),
        }
    }
}

/// Schedule cadence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    /// Gap between successive default slots on one platform, in seconds.
    pub cadence_secs: i64,
    /// Per-platform offset step to avoid cross-platform bursts, in seconds.
    pub stagger_secs: i64,
    /// Delay step applied per prior attempt when retrying a failed entry.
    pub retry_backoff_secs: i64,
    /// Attempts after which a failed entry is skipped.
    pub max_attempts: u32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            cadence_secs: 600,
            stagger_secs: 10,
            retry_backoff_secs: 60,
            max_attempts: 3,
        }
    }
}

/// Publish batch settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PublisherSettings {
    /// Maximum concurrent platform calls per batch.
    pub max_parallel: usize,
    /// Per-call timeout in milliseconds.
    pub call_timeout_ms: u64,
    /// Attempts per call before the failure becomes terminal.
    pub max_attempts: u32,
    /// Cap on the exponential retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            call_timeout_ms: 5_000,
            max_attempts: 3,
            max_retry_delay_ms: 30_000,
        }
    }
}

/// Engagement scoring weights.
///
/// Applied to raw platform metrics before normalization; relative magnitude
/// is what matters, the scores are rescaled per recompute pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSettings {
    pub likes_weight: f64,
    pub shares_weight: f64,
    pub comments_weight: f64,
    pub retweets_weight: f64,
    pub quotes_weight: f64,
    pub views_weight: f64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            likes_weight: 0.5,
            shares_weight: 0.3,
            comments_weight: 0.2,
            retweets_weight: 0.3,
            quotes_weight: 0.2,
            views_weight: 0.1,
        }
    }
}

impl AnalyticsSettings {
    /// Sum of all weights, used for validation.
    #[must_use]
    pub fn weight_sum(&self) -> f64 {
        self.likes_weight
            + self.shares_weight
            + self.comments_weight
            + self.retweets_weight
            + self.quotes_weight
            + self.views_weight
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Tracing filter directive (`info`, `sentinel=debug`, ...).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        SentinelSettings::default().validate().unwrap();
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let mut s = SentinelSettings::default();
        s.guard.flag_threshold = 5;
        s.guard.quarantine_threshold = 2;
        assert!(s.validate().is_err());
    }

    #[test]
    fn zero_parallelism_rejected() {
        let mut s = SentinelSettings::default();
        s.publisher.max_parallel = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn zero_weights_rejected() {
        let mut s = SentinelSettings::default();
        s.analytics = AnalyticsSettings {
            likes_weight: 0.0,
            shares_weight: 0.0,
            comments_weight: 0.0,
            retweets_weight: 0.0,
            quotes_weight: 0.0,
            views_weight: 0.0,
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: SentinelSettings =
            serde_json::from_str(r#"{"server": {"port": 9090}}"#).unwrap();
        assert_eq!(s.server.port, 9090);
        assert_eq!(s.server.host, "127.0.0.1");
        assert_eq!(s.scheduler.cadence_secs, 600);
    }

    #[test]
    fn camel_case_wire_format() {
        let json = serde_json::to_value(SentinelSettings::default()).unwrap();
        assert!(json["guard"]["quarantineThreshold"].is_u64());
        assert!(json["publisher"]["callTimeoutMs"].is_u64());
    }
}
