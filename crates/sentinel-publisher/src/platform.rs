//! Platform formatting and the deterministic simulators.
//!
//! Each platform gets the body it would really want: twitter truncated to
//! its character budget, instagram with the caption tags, linkedin as a
//! titled article, sanatan as script plus audio. The simulated endpoints
//! synthesize engagement metrics by hashing (content, platform) so repeat
//! runs see identical numbers.

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use sentinel_core::{ContentId, ContentItem, Platform, Result, SentinelError};

/// Twitter's character budget.
const TWEET_CHAR_LIMIT: usize = 280;

/// Caption tags appended to instagram posts.
const INSTAGRAM_TAGS: &str = "\n#Inspiration #Multilingual";

/// A body shaped for one platform.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPost {
    /// The item being posted.
    pub content_id: ContentId,
    /// Target platform.
    pub platform: Platform,
    /// Article title (linkedin only).
    pub title: Option<String>,
    /// Platform-shaped body text.
    pub body: String,
    /// Audio asset path (voice content only).
    pub audio_path: Option<String>,
    /// Human-readable format tag.
    pub format: &'static str,
}

/// Shape an item's body for a platform.
///
/// Items without screenable text (a bare audio asset) still format for
/// sanatan; every other platform needs text.
pub fn format_post(item: &ContentItem, platform: Platform) -> Result<FormattedPost> {
    let text = item.body.text().unwrap_or_default();
    let audio_path = match &item.body {
        sentinel_core::ContentBody::Asset { path, .. } => Some(path.clone()),
        sentinel_core::ContentBody::Text(_) => None,
    };
    if text.is_empty() && platform != Platform::Sanatan {
        return Err(SentinelError::Validation(format!(
            "content {} has no text body for {platform}",
            item.id
        )));
    }

    let post = match platform {
        Platform::Twitter => FormattedPost {
            content_id: item.id.clone(),
            platform,
            title: None,
            body: truncate_chars(text, TWEET_CHAR_LIMIT),
            audio_path,
            format: "short text + TTS snippet",
        },
        Platform::Instagram => FormattedPost {
            content_id: item.id.clone(),
            platform,
            title: None,
            body: format!("{text}{INSTAGRAM_TAGS}"),
            audio_path,
            format: "text + audio thumbnail",
        },
        Platform::Linkedin => FormattedPost {
            content_id: item.id.clone(),
            platform,
            title: Some(format!("Multilingual Insight {}", item.id)),
            body: text.to_string(),
            audio_path,
            format: "title + summary + TTS",
        },
        Platform::Sanatan => FormattedPost {
            content_id: item.id.clone(),
            platform,
            title: None,
            body: text.to_string(),
            audio_path,
            format: "voice script + audio",
        },
    };
    Ok(post)
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// Engagement numbers a platform reports back for one post.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
    pub retweets: u64,
    pub quotes: u64,
    pub views: u64,
}

/// What a platform call returns on success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformResponse {
    /// Platform-side post identifier.
    pub external_ref: String,
    /// Synthesized engagement numbers.
    pub metrics: EngagementMetrics,
}

/// The platform call seam. Tests substitute failing or counting clients.
pub trait PlatformClient: Send + Sync {
    /// Post one formatted body under a bearer credential.
    fn post(&self, token: &str, post: &FormattedPost) -> Result<PlatformResponse>;
}

/// In-process simulator for all four platforms.
///
/// Deterministic: the external ref and metrics derive from a hash of the
/// (content, platform) pair. An injectable fault budget makes the first N
/// calls fail with a transient error, for exercising retry paths.
#[derive(Debug, Default)]
pub struct SimulatedPlatform {
    faults_remaining: AtomicU32,
    calls: AtomicU32,
}

impl SimulatedPlatform {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` calls with a transient transport fault.
    #[must_use]
    pub fn with_faults(n: u32) -> Self {
        Self {
            faults_remaining: AtomicU32::new(n),
            calls: AtomicU32::new(0),
        }
    }

    /// Total calls that reached the simulator (including faulted ones).
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PlatformClient for SimulatedPlatform {
    fn post(&self, token: &str, post: &FormattedPost) -> Result<PlatformResponse> {
        let _ = self.calls.fetch_add(1, Ordering::SeqCst);
        if token.is_empty() {
            return Err(SentinelError::Authentication(
                "empty bearer token".to_string(),
            ));
        }
        if self
            .faults_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SentinelError::transient(
                post.platform.as_str(),
                "simulated transport fault",
            ));
        }
        Ok(simulate_response(&post.content_id, post.platform))
    }
}

/// Hash-derived response for a (content, platform) pair.
fn simulate_response(content_id: &ContentId, platform: Platform) -> PlatformResponse {
    let digest = Sha256::digest(format!("{content_id}|{platform}").as_bytes());
    let word = |i: usize| -> u64 {
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[i * 8..i * 8 + 8]);
        u64::from_be_bytes(bytes)
    };
    PlatformResponse {
        external_ref: format!("{platform}-{:016x}", word(0)),
        metrics: EngagementMetrics {
            likes: word(0) % 1_000,
            shares: word(1) % 500,
            comments: word(2) % 300,
            retweets: word(3) % 400,
            quotes: word(1).rotate_left(17) % 200,
            views: word(2).rotate_left(31) % 10_000,
        },
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sentinel_core::{ContentBody, ContentKind, Sentiment};

    fn item(id: &str, text: &str) -> ContentItem {
        ContentItem {
            id: ContentId::from(id),
            kind: ContentKind::Tweet,
            language: "en".into(),
            sentiment: Sentiment::Neutral,
            body: ContentBody::Text(text.into()),
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn twitter_truncates_to_the_character_budget() {
        let long = "x".repeat(400);
        let post = format_post(&item("c1", &long), Platform::Twitter).unwrap();
        assert_eq!(post.body.chars().count(), TWEET_CHAR_LIMIT);
    }

    #[test]
    fn instagram_appends_caption_tags() {
        let post = format_post(&item("c1", "morning calm"), Platform::Instagram).unwrap();
        assert!(post.body.ends_with(INSTAGRAM_TAGS));
    }

    #[test]
    fn linkedin_gets_a_title() {
        let post = format_post(&item("c1", "a longer insight"), Platform::Linkedin).unwrap();
        assert_eq!(post.title.as_deref(), Some("Multilingual Insight c1"));
        assert_eq!(post.body, "a longer insight");
    }

    #[test]
    fn sanatan_carries_the_audio_path() {
        let voice = ContentItem {
            body: ContentBody::Asset {
                path: "audio/c1.mp3".into(),
                script: Some("om shanti".into()),
            },
            kind: ContentKind::Voice,
            ..item("c1", "")
        };
        let post = format_post(&voice, Platform::Sanatan).unwrap();
        assert_eq!(post.audio_path.as_deref(), Some("audio/c1.mp3"));
        assert_eq!(post.body, "om shanti");
    }

    #[test]
    fn textless_item_is_rejected_except_for_sanatan() {
        let mute = ContentItem {
            body: ContentBody::Asset {
                path: "audio/c1.mp3".into(),
                script: None,
            },
            ..item("c1", "")
        };
        assert_matches!(
            format_post(&mute, Platform::Twitter),
            Err(SentinelError::Validation(_))
        );
        assert!(format_post(&mute, Platform::Sanatan).is_ok());
    }

    #[test]
    fn simulator_is_deterministic_per_pair() {
        let sim = SimulatedPlatform::new();
        let post = format_post(&item("c1", "t"), Platform::Twitter).unwrap();
        let a = sim.post("tok", &post).unwrap();
        let b = sim.post("tok", &post).unwrap();
        assert_eq!(a, b);

        let other = format_post(&item("c1", "t"), Platform::Instagram).unwrap();
        let c = sim.post("tok", &other).unwrap();
        assert_ne!(a.external_ref, c.external_ref);
    }

    #[test]
    fn fault_budget_fails_then_recovers() {
        let sim = SimulatedPlatform::with_faults(2);
        let post = format_post(&item("c1", "t"), Platform::Twitter).unwrap();
        assert_matches!(
            sim.post("tok", &post),
            Err(SentinelError::TransientPublish { .. })
        );
        assert_matches!(
            sim.post("tok", &post),
            Err(SentinelError::TransientPublish { .. })
        );
        assert!(sim.post("tok", &post).is_ok());
        assert_eq!(sim.call_count(), 3);
    }

    #[test]
    fn empty_token_is_an_authentication_error() {
        let sim = SimulatedPlatform::new();
        let post = format_post(&item("c1", "t"), Platform::Twitter).unwrap();
        assert_matches!(sim.post("", &post), Err(SentinelError::Authentication(_)));
    }
}
