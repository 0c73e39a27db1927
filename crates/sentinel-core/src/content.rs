//! The content data model.
//!
//! Upstream generators emit per-language JSON collections whose records put
//! their text under whichever field matches the record kind (`tweet`,
//! `post`, `voice_script`) or reference an audio asset. That open shape is
//! normalized at the ingestion boundary into the closed [`ContentBody`]
//! union so the rest of the pipeline stays statically typed.

use serde::{Deserialize, Serialize};

use crate::ids::ContentId;

// ─────────────────────────────────────────────────────────────────────────────
// Enumerations
// ─────────────────────────────────────────────────────────────────────────────

/// Kind of generated content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Short-form post for microblogging platforms.
    Tweet,
    /// Long-form post.
    Post,
    /// Script text destined for TTS rendering.
    VoiceScript,
    /// Rendered audio asset.
    Voice,
}

impl ContentKind {
    /// Stable string form used in SQL and on the wire.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tweet => "tweet",
            Self::Post => "post",
            Self::VoiceScript => "voice_script",
            Self::Voice => "voice",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "tweet" => Some(Self::Tweet),
            "post" => Some(Self::Post),
            "voice_script" => Some(Self::VoiceScript),
            "voice" => Some(Self::Voice),
            _ => None,
        }
    }
}

/// Target publishing platform.
///
/// All platform calls are deterministic in-process simulators; the set is
/// still closed so schedule entries and publish records stay well-typed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Short-text platform (280-char limit).
    Twitter,
    /// Image/caption platform.
    Instagram,
    /// Professional long-form platform.
    Linkedin,
    /// First-party voice-content channel.
    Sanatan,
}

impl Platform {
    /// All platforms, in stable (lexical-stagger) order.
    pub const ALL: [Self; 4] = [Self::Twitter, Self::Instagram, Self::Linkedin, Self::Sanatan];

    /// Stable string form used in SQL and route paths.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Instagram => "instagram",
            Self::Linkedin => "linkedin",
            Self::Sanatan => "sanatan",
        }
    }

    /// Parse the stable string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "twitter" => Some(Self::Twitter),
            "instagram" => Some(Self::Instagram),
            "linkedin" => Some(Self::Linkedin),
            "sanatan" => Some(Self::Sanatan),
            _ => None,
        }
    }

    /// Zero-based stable index, used to stagger default schedule slots.
    #[must_use]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sentiment tag assigned upstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    /// Positive, encouraging tone.
    Uplifting,
    /// Neutral, informational tone.
    Neutral,
    /// Devotional tone.
    Devotional,
}

impl Sentiment {
    /// Stable string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uplifting => "uplifting",
            Self::Neutral => "neutral",
            Self::Devotional => "devotional",
        }
    }

    /// Parse the stable string form, defaulting unknown tags to neutral.
    #[must_use]
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "uplifting" => Self::Uplifting,
            "devotional" => Self::Devotional,
            _ => Self::Neutral,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Closed body union produced at the ingestion boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ContentBody {
    /// Inline text (tweets, posts, voice scripts).
    Text(String),
    /// Path to a rendered audio asset, plus the script it was rendered from
    /// when the upstream record carried one.
    Asset {
        /// Relative path to the audio file.
        path: String,
        /// Source script text, if present upstream.
        script: Option<String>,
    },
}

impl ContentBody {
    /// The screenable text of this body, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            Self::Asset { script, .. } => script.as_deref(),
        }
    }
}

/// A generated unit of content. Immutable to this pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    /// Upstream identifier.
    pub id: ContentId,
    /// Content kind.
    pub kind: ContentKind,
    /// BCP-47-ish language code (`en`, `hi`, `sa`, ...).
    pub language: String,
    /// Sentiment tag.
    pub sentiment: Sentiment,
    /// Normalized body.
    pub body: ContentBody,
    /// When the generator produced it (RFC 3339).
    pub created_at: String,
}

/// Quality metrics for a content item. Read-only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSet {
    /// Ethics score in `[0, 1]`.
    pub ethics: f64,
    /// Virality score in `[0, 1]`.
    pub virality: f64,
    /// Neutrality score in `[0, 1]`.
    pub neutrality: f64,
}

impl ScoreSet {
    /// Whether every component is inside the unit interval.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.ethics, self.virality, self.neutrality]
            .iter()
            .all(|v| (0.0..=1.0).contains(v))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
