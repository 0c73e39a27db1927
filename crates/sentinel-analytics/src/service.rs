//! Engagement aggregation.
//!
//! Scores are derived from raw per-group metric totals so that the result
//! is exactly reproducible under any permutation of the input records:
//! integer totals are commutative, and the float weights are applied once
//! per group rather than once per record.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use sentinel_core::{Platform, Result, Sentiment};
use sentinel_publisher::{PublishRecord, PublishRecordRepo};
use sentinel_settings::AnalyticsSettings;
use sentinel_store::Store;

use crate::repository::SuggestionRepo;
use crate::types::{group_key, StrategySuggestion, SuggestionKind};

#[derive(Clone, Debug)]
struct GroupTotals {
    platform: Platform,
    language: String,
    sentiment: Sentiment,
    records: u64,
    likes: u64,
    shares: u64,
    comments: u64,
    retweets: u64,
    quotes: u64,
    views: u64,
}

impl GroupTotals {
    fn new(record: &PublishRecord) -> Self {
        Self {
            platform: record.platform,
            language: record.language.clone(),
            sentiment: record.sentiment,
            records: 0,
            likes: 0,
            shares: 0,
            comments: 0,
            retweets: 0,
            quotes: 0,
            views: 0,
        }
    }

    fn absorb(&mut self, record: &PublishRecord) {
        let m = &record.metrics;
        self.records += 1;
        self.likes = self.likes.saturating_add(m.likes);
        self.shares = self.shares.saturating_add(m.shares);
        self.comments = self.comments.saturating_add(m.comments);
        self.retweets = self.retweets.saturating_add(m.retweets);
        self.quotes = self.quotes.saturating_add(m.quotes);
        self.views = self.views.saturating_add(m.views);
    }

    /// Mean weighted engagement score per record in the group.
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, w: &AnalyticsSettings) -> f64 {
        let weighted = w.likes_weight * self.likes as f64
            + w.shares_weight * self.shares as f64
            + w.comments_weight * self.comments as f64
            + w.retweets_weight * self.retweets as f64
            + w.quotes_weight * self.quotes as f64
            + w.views_weight * self.views as f64;
        weighted / self.records.max(1) as f64
    }
}

/// Derive the ranked suggestion set from a record snapshot.
///
/// Groups by (platform, language, sentiment), ranks descending by score
/// with ties broken by lexical group key, and splits high-performing from
/// underperforming at the cross-group mean.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn derive_suggestions(
    settings: &AnalyticsSettings,
    records: &[PublishRecord],
) -> Vec<StrategySuggestion> {
    let mut groups: BTreeMap<String, GroupTotals> = BTreeMap::new();
    for record in records {
        let key = group_key(record.platform, &record.language, record.sentiment);
        groups
            .entry(key)
            .or_insert_with(|| GroupTotals::new(record))
            .absorb(record);
    }
    if groups.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(String, GroupTotals, f64)> = groups
        .into_iter()
        .map(|(key, totals)| {
            let score = totals.score(settings);
            (key, totals, score)
        })
        .collect();
    scored.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));

    let mean = scored.iter().map(|(_, _, s)| s).sum::<f64>() / scored.len() as f64;

    scored
        .into_iter()
        .enumerate()
        .map(|(i, (key, totals, score))| {
            let kind = if score >= mean {
                SuggestionKind::HighPerforming
            } else {
                SuggestionKind::Underperforming
            };
            let message = match kind {
                SuggestionKind::HighPerforming => format!(
                    "Increase {} {} content on {} for better engagement.",
                    totals.sentiment.as_str(),
                    totals.language,
                    totals.platform
                ),
                SuggestionKind::Underperforming => format!(
                    "Reduce {} {} content on {} due to low engagement.",
                    totals.sentiment.as_str(),
                    totals.language,
                    totals.platform
                ),
            };
            StrategySuggestion {
                group_key: key,
                platform: totals.platform,
                language: totals.language,
                sentiment: totals.sentiment,
                score,
                kind,
                message,
                rank: (i + 1) as u32,
            }
        })
        .collect()
}

/// Recomputes ranked suggestions from the current publish records.
pub struct AnalyticsAggregator {
    store: Arc<Store>,
    settings: AnalyticsSettings,
}

impl AnalyticsAggregator {
    #[must_use]
    pub fn new(store: Arc<Store>, settings: AnalyticsSettings) -> Self {
        Self { store, settings }
    }

    /// Rebuild the suggestion snapshot from all publish records.
    ///
    /// The record read and the wholesale replace run in one transaction, so
    /// the stored set always reflects exactly one record snapshot.
    pub fn recompute(&self) -> Result<Vec<StrategySuggestion>> {
        let suggestions = self.store.write(|tx| {
            let records = PublishRecordRepo::list(tx)?;
            debug!(records = records.len(), "recomputing suggestions");
            let suggestions = derive_suggestions(&self.settings, &records);
            SuggestionRepo::replace_all(tx, &suggestions)?;
            Ok(suggestions)
        })?;
        info!(suggestions = suggestions.len(), "suggestion set replaced");
        Ok(suggestions)
    }

    /// The stored suggestion set, in rank order.
    pub fn current(&self) -> Result<Vec<StrategySuggestion>> {
        self.store.read(SuggestionRepo::list)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
