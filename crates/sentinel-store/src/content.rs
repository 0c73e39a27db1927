//! Read-only content ingestion.
//!
//! The generator stage drops per-language JSON collections into a content
//! directory (`<dir>/<lang>.json`), plus a parallel `scores.json` keyed by
//! content id. Upstream records are loosely shaped — the text sits under
//! whichever field matches the record kind — so ingestion normalizes each
//! record into the closed [`ContentItem`] model and skips anything
//! malformed with a warning rather than aborting the load.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use sentinel_core::{
    ContentBody, ContentId, ContentItem, ContentKind, Result, ScoreSet, Sentiment,
};

/// Scores file name inside the content directory.
const SCORES_FILE: &str = "scores.json";

/// Raw upstream record, tolerant of the open generator shape.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(alias = "content_id")]
    id: Option<String>,
    #[serde(alias = "content_type")]
    kind: Option<String>,
    language: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
    #[serde(default)]
    tweet: Option<String>,
    #[serde(default)]
    post: Option<String>,
    #[serde(default)]
    voice_script: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default, alias = "dummy_audio_path")]
    audio_path: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl RawRecord {
    /// Normalize into the closed model; `None` means the record is unusable.
    fn normalize(self, fallback_language: &str) -> Option<ContentItem> {
        let id = self.id?;
        let language = self
            .language
            .unwrap_or_else(|| fallback_language.to_string());
        let sentiment = Sentiment::from_str_lossy(self.sentiment.as_deref().unwrap_or("neutral"));

        // Infer the kind from whichever body field is present when the
        // record doesn't declare one.
        let declared = self.kind.as_deref().and_then(ContentKind::from_str_opt);
        let (kind, body) = if let Some(path) = self.audio_path {
            (
                declared.unwrap_or(ContentKind::Voice),
                ContentBody::Asset {
                    path,
                    script: self.voice_script.or(self.text),
                },
            )
        } else if let Some(t) = self.tweet {
            (declared.unwrap_or(ContentKind::Tweet), ContentBody::Text(t))
        } else if let Some(p) = self.post {
            (declared.unwrap_or(ContentKind::Post), ContentBody::Text(p))
        } else if let Some(v) = self.voice_script {
            (
                declared.unwrap_or(ContentKind::VoiceScript),
                ContentBody::Text(v),
            )
        } else if let Some(t) = self.text {
            (declared.unwrap_or(ContentKind::Post), ContentBody::Text(t))
        } else {
            return None;
        };

        Some(ContentItem {
            id: ContentId::from(id),
            kind,
            language,
            sentiment,
            body,
            created_at: self
                .created_at
                .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
        })
    }
}

/// In-memory read model over the generated content set.
///
/// Read-only from the pipeline's perspective; the kill switch erases the
/// backing directory but never mutates a loaded store.
#[derive(Debug, Default)]
pub struct ContentStore {
    by_language: BTreeMap<String, Vec<ContentItem>>,
    by_id: HashMap<ContentId, ContentItem>,
    scores: HashMap<ContentId, ScoreSet>,
}

impl ContentStore {
    /// Load every `<lang>.json` collection plus `scores.json` from `dir`.
    ///
    /// A missing directory yields an empty store; malformed files or
    /// records are skipped with a warning.
    pub fn load(dir: &Path) -> Result<Self> {
        let mut store = Self::default();
        if !dir.is_dir() {
            debug!(?dir, "content directory absent, starting empty");
            return Ok(store);
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".json") || name == SCORES_FILE {
                continue;
            }
            let lang = name.trim_end_matches(".json");

            let data = match std::fs::read_to_string(&path) {
                Ok(d) => d,
                Err(e) => {
                    warn!(?path, error = %e, "unreadable content file, skipping");
                    continue;
                }
            };
            let records: Vec<RawRecord> = match serde_json::from_str(&data) {
                Ok(r) => r,
                Err(e) => {
                    warn!(?path, error = %e, "unparseable content file, skipping");
                    continue;
                }
            };

            for raw in records {
                match raw.normalize(lang) {
                    Some(item) => store.insert(item),
                    None => warn!(file = name, "record missing id or body, skipping"),
                }
            }
        }

        store.scores = load_scores(&dir.join(SCORES_FILE));
        debug!(
            items = store.by_id.len(),
            languages = store.by_language.len(),
            scores = store.scores.len(),
            "content store loaded"
        );
        Ok(store)
    }

    /// Build a store directly from items and scores (used by tests and the
    /// on-demand publish path).
    #[must_use]
    pub fn from_parts(
        items: impl IntoIterator<Item = ContentItem>,
        scores: HashMap<ContentId, ScoreSet>,
    ) -> Self {
        let mut store = Self {
            scores,
            ..Self::default()
        };
        for item in items {
            store.insert(item);
        }
        store
    }

    fn insert(&mut self, item: ContentItem) {
        self.by_language
            .entry(item.language.clone())
            .or_default()
            .push(item.clone());
        let _ = self.by_id.insert(item.id.clone(), item);
    }

    /// Look up one item.
    #[must_use]
    pub fn item(&self, id: &ContentId) -> Option<&ContentItem> {
        self.by_id.get(id)
    }

    /// Items grouped by language, languages in lexical order.
    #[must_use]
    pub fn by_language(&self) -> &BTreeMap<String, Vec<ContentItem>> {
        &self.by_language
    }

    /// Quality scores for one item.
    #[must_use]
    pub fn scores(&self, id: &ContentId) -> Option<ScoreSet> {
        self.scores.get(id).copied()
    }

    /// Total item count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Whether the store holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All items in id order (canonical iteration for archiving).
    #[must_use]
    pub fn items_sorted(&self) -> Vec<ContentItem> {
        let mut items: Vec<ContentItem> = self.by_id.values().cloned().collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        items
    }
}

fn load_scores(path: &Path) -> HashMap<ContentId, ScoreSet> {
    let Ok(data) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    match serde_json::from_str::<HashMap<String, ScoreSet>>(&data) {
        Ok(raw) => raw
            .into_iter()
            .filter(|(_, s)| s.is_valid())
            .map(|(k, v)| (ContentId::from(k), v))
            .collect(),
        Err(e) => {
            warn!(?path, error = %e, "unparseable scores file, ignoring");
            HashMap::new()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
