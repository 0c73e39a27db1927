//! Suggestion types.

use serde::{Deserialize, Serialize};

use sentinel_core::{Platform, Sentiment};

/// Which side of the engagement mean a group landed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuggestionKind {
    /// Scored at or above the mean across groups.
    #[serde(rename = "high-performing")]
    HighPerforming,
    /// Scored below the mean.
    #[serde(rename = "underperforming")]
    Underperforming,
}

impl SuggestionKind {
    /// Stable string form, matching the stored representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighPerforming => "high-performing",
            Self::Underperforming => "underperforming",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "high-performing" => Some(Self::HighPerforming),
            "underperforming" => Some(Self::Underperforming),
            _ => None,
        }
    }
}

/// A ranked recommendation over one (platform, language, sentiment) group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySuggestion {
    /// `platform|language|sentiment`, the grouping identity.
    pub group_key: String,
    /// Target platform of the group.
    pub platform: Platform,
    /// Language of the group.
    pub language: String,
    /// Sentiment of the group.
    pub sentiment: Sentiment,
    /// Mean weighted engagement score across the group's records.
    pub score: f64,
    /// Above or below the cross-group mean.
    pub kind: SuggestionKind,
    /// Operator-facing recommendation text.
    pub message: String,
    /// 1-based position after ranking.
    pub rank: u32,
}

/// Build the canonical group key for one record's grouping attributes.
#[must_use]
pub fn group_key(platform: Platform, language: &str, sentiment: Sentiment) -> String {
    format!("{platform}|{language}|{}", sentiment.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_the_stored_form() {
        for kind in [SuggestionKind::HighPerforming, SuggestionKind::Underperforming] {
            assert_eq!(SuggestionKind::from_str_opt(kind.as_str()), Some(kind));
        }
        assert_eq!(SuggestionKind::from_str_opt("middling"), None);
    }

    #[test]
    fn group_key_is_pipe_delimited() {
        assert_eq!(
            group_key(Platform::Twitter, "english", Sentiment::Uplifting),
            "twitter|english|uplifting"
        );
    }
}
