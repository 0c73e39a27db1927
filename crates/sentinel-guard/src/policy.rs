//! Lexical screening policy.
//!
//! Classification rules:
//! - a critical-term hit quarantines immediately, regardless of count
//! - a deny-term match count above the quarantine threshold quarantines
//! - a count at or above the flag threshold flags
//! - anything else is clean
//!
//! Flagged and quarantined are two independently configured severities;
//! collapsing them into one threshold loses the distinction between
//! "publishable but worth a look" and "blocked outright".

use regex::{Regex, RegexBuilder};

use sentinel_core::{Result, SentinelError};
use sentinel_settings::GuardSettings;

use crate::types::VerdictStatus;

/// Built-in deny terms, always active.
pub const DENY_TERMS: &[&str] = &[
    "religion",
    "religious",
    "politics",
    "political",
    "bias",
    "offensive",
    "racist",
    "sexist",
    "controversial",
];

/// Built-in critical terms; any hit quarantines outright.
pub const CRITICAL_TERMS: &[&str] = &["racist", "sexist"];

/// Compiled screening policy.
#[derive(Debug)]
pub struct ScreeningPolicy {
    deny: Regex,
    critical: Regex,
    flag_threshold: usize,
    quarantine_threshold: usize,
}

/// Outcome of evaluating one body of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreeningOutcome {
    /// Classification.
    pub status: VerdictStatus,
    /// Every matched term, lowercased, in order of appearance.
    pub matches: Vec<String>,
}

impl ScreeningPolicy {
    /// Compile the built-in term lists plus any configured extras.
    pub fn from_settings(settings: &GuardSettings) -> Result<Self> {
        let deny = compile_terms(DENY_TERMS, &settings.extra_deny_terms)?;
        let critical = compile_terms(CRITICAL_TERMS, &settings.extra_critical_terms)?;
        Ok(Self {
            deny,
            critical,
            flag_threshold: settings.flag_threshold,
            quarantine_threshold: settings.quarantine_threshold,
        })
    }

    /// Evaluate a body of text. `None` (no screenable text) is clean.
    #[must_use]
    pub fn evaluate(&self, text: Option<&str>) -> ScreeningOutcome {
        let Some(text) = text else {
            return ScreeningOutcome {
                status: VerdictStatus::Clean,
                matches: Vec::new(),
            };
        };

        let matches: Vec<String> = self
            .deny
            .find_iter(text)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        let critical_hit = self.critical.is_match(text);

        let status = if critical_hit || matches.len() > self.quarantine_threshold {
            VerdictStatus::Quarantined
        } else if !matches.is_empty() && matches.len() >= self.flag_threshold {
            VerdictStatus::Flagged
        } else {
            VerdictStatus::Clean
        };

        ScreeningOutcome { status, matches }
    }
}

/// Compile a case-insensitive whole-word alternation over two term lists.
fn compile_terms(builtin: &[&str], extra: &[String]) -> Result<Regex> {
    let mut terms: Vec<String> = builtin.iter().map(|t| regex::escape(t)).collect();
    terms.extend(extra.iter().map(|t| regex::escape(t)));
    let pattern = format!(r"\b(?:{})\b", terms.join("|"));
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| SentinelError::Validation(format!("bad screening term list: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
