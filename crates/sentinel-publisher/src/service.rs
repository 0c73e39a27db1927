//! Publish orchestration.
//!
//! The simulator publishes one schedule entry at a time, idempotently: a
//! (content, platform) pair that already has a record returns that record
//! without a platform call. The batch path drains the due queue under a
//! bounded pool, retries transient faults with a capped exponential delay,
//! and reports every outcome back to the scheduler.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use sentinel_core::{ContentId, EntryId, Platform, Result, RetryPolicy, SentinelError};
use sentinel_scheduler::{EntryState, PublishOutcome, ScheduleEntry, Scheduler};
use sentinel_settings::PublisherSettings;
use sentinel_store::{ContentStore, Store};

use crate::platform::{format_post, PlatformClient};
use crate::repository::{PublishRecord, PublishRecordRepo};
use crate::token::BearerTokenSource;

/// Outcome counts for one batch pass over the due queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Entries handed off by the scheduler this pass.
    pub attempted: usize,
    /// Entries that ended the pass published.
    pub published: usize,
    /// Entries pushed back into the due queue for a later pass.
    pub requeued: usize,
    /// Entries that went terminal (skipped or failed).
    pub abandoned: usize,
}

/// Simulated platform publisher over one store.
pub struct PublisherSimulator {
    store: Arc<Store>,
    content: Arc<ContentStore>,
    client: Arc<dyn PlatformClient>,
    tokens: BearerTokenSource,
    settings: PublisherSettings,
}

impl PublisherSimulator {
    pub fn new(
        store: Arc<Store>,
        content: Arc<ContentStore>,
        client: Arc<dyn PlatformClient>,
        tokens: BearerTokenSource,
        settings: PublisherSettings,
    ) -> Self {
        Self {
            store,
            content,
            client,
            tokens,
            settings,
        }
    }

    /// Publish one schedule entry.
    ///
    /// Idempotent: if a record already exists for the (content, platform)
    /// pair, it is returned as-is and the platform is never called. The
    /// record insert re-checks the pair inside the write transaction, so
    /// concurrent publishers converge on a single record.
    pub fn publish(&self, entry: &ScheduleEntry) -> Result<PublishRecord> {
        let content_id = entry.content_id.clone();
        let platform = entry.platform;
        if let Some(existing) = self
            .store
            .read(|conn| PublishRecordRepo::for_pair(conn, &content_id, platform))?
        {
            debug!(
                content_id = content_id.as_str(),
                %platform,
                "pair already published, returning existing record"
            );
            return Ok(existing);
        }
        self.execute(entry.id.clone(), &entry.content_id, entry.platform)
    }

    /// Publish outside the schedule, minting a fresh entry id.
    ///
    /// Used by the serving boundary for operator-triggered publishes. The
    /// pair-level idempotence guarantee still holds: a pair the pipeline
    /// already published returns the existing record.
    pub fn publish_on_demand(
        &self,
        content_id: &ContentId,
        platform: Platform,
    ) -> Result<PublishRecord> {
        if let Some(existing) = self
            .store
            .read(|conn| PublishRecordRepo::for_pair(conn, content_id, platform))?
        {
            return Ok(existing);
        }
        self.execute(EntryId::new(), content_id, platform)
    }

    fn execute(
        &self,
        entry_id: EntryId,
        content_id: &ContentId,
        platform: Platform,
    ) -> Result<PublishRecord> {
        let item = self.content.item(content_id).ok_or_else(|| {
            SentinelError::Validation(format!("unknown content id {}", content_id.as_str()))
        })?;
        let post = format_post(item, platform)?;
        let token = self.tokens.issue()?;
        let response = self.client.post(&token, &post)?;

        let record = PublishRecord {
            entry_id,
            content_id: content_id.clone(),
            platform,
            language: item.language.clone(),
            sentiment: item.sentiment,
            published_at: Utc::now(),
            external_ref: response.external_ref,
            metrics: response.metrics,
        };
        let stored = self.store.write(move |tx| {
            if let Some(existing) =
                PublishRecordRepo::for_pair(tx, &record.content_id, record.platform)?
            {
                return Ok(existing);
            }
            PublishRecordRepo::insert(tx, &record)?;
            Ok(record)
        })?;
        info!(
            content_id = stored.content_id.as_str(),
            platform = %stored.platform,
            external_ref = stored.external_ref,
            "published"
        );
        Ok(stored)
    }

    /// Publish one entry with in-flight retries for transient faults.
    ///
    /// Each attempt runs the blocking publish under the per-call timeout; a
    /// timeout counts as a transient fault. Non-retryable errors return
    /// immediately, retryable ones sleep a capped exponential delay between
    /// attempts.
    pub async fn publish_with_retries(
        self: &Arc<Self>,
        entry: &ScheduleEntry,
    ) -> Result<PublishRecord> {
        let policy = RetryPolicy {
            max_attempts: self.settings.max_attempts,
            max_delay_ms: self.settings.max_retry_delay_ms,
            ..RetryPolicy::default()
        };
        let call_timeout = Duration::from_millis(self.settings.call_timeout_ms);

        let mut attempt: u32 = 0;
        loop {
            let this = Arc::clone(self);
            let task_entry = entry.clone();
            let outcome = tokio::time::timeout(
                call_timeout,
                tokio::task::spawn_blocking(move || this.publish(&task_entry)),
            )
            .await;
            let result = match outcome {
                Err(_) => Err(SentinelError::transient(
                    entry.platform.to_string(),
                    "platform call timed out",
                )),
                Ok(Err(join)) => Err(SentinelError::transient(
                    entry.platform.to_string(),
                    format!("publish task aborted: {join}"),
                )),
                Ok(Ok(result)) => result,
            };
            match result {
                Ok(record) => return Ok(record),
                Err(err) if err.is_retryable() && policy.allows(attempt + 1) => {
                    let delay = policy.exponential_delay_ms(attempt);
                    debug!(
                        entry_id = entry.id.as_str(),
                        attempt,
                        delay_ms = delay,
                        error = %err,
                        "transient publish fault, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Drain the due queue once.
    ///
    /// The batch is exactly what the scheduler's claim pass hands off, so an
    /// entry never reaches two concurrent batches; retried entries park back
    /// at pending and come through a later claim. Everything due publishes
    /// under a pool bounded by `max_parallel`, and each outcome is reported
    /// back to the scheduler. A failure on one entry never aborts the batch.
    pub async fn publish_due(
        self: &Arc<Self>,
        scheduler: &Arc<Scheduler>,
        now: DateTime<Utc>,
    ) -> Result<BatchReport> {
        let batch = scheduler.due_entries(now)?;
        let mut report = BatchReport {
            attempted: batch.len(),
            ..BatchReport::default()
        };
        if batch.is_empty() {
            return Ok(report);
        }
        info!(entries = batch.len(), "publishing due batch");

        let limit = Arc::new(Semaphore::new(self.settings.max_parallel.max(1)));
        let mut pool: JoinSet<(EntryId, Result<PublishRecord>)> = JoinSet::new();
        for entry in batch {
            let this = Arc::clone(self);
            let limit = Arc::clone(&limit);
            let _ = pool.spawn(async move {
                let _permit = limit.acquire_owned().await;
                let result = this.publish_with_retries(&entry).await;
                (entry.id, result)
            });
        }

        while let Some(joined) = pool.join_next().await {
            let (entry_id, result) = match joined {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(error = %err, "publish task panicked");
                    continue;
                }
            };
            let outcome = match &result {
                Ok(_) => PublishOutcome::Published,
                Err(err) => {
                    warn!(entry_id = entry_id.as_str(), error = %err, "publish failed");
                    PublishOutcome::Failed {
                        retryable: err.is_retryable(),
                    }
                }
            };
            match scheduler.mark_result(&entry_id, outcome) {
                Ok(updated) => match updated.state {
                    EntryState::Published => report.published += 1,
                    EntryState::Pending | EntryState::Due => report.requeued += 1,
                    EntryState::Skipped | EntryState::Failed => report.abandoned += 1,
                },
                Err(err) => {
                    warn!(entry_id = entry_id.as_str(), error = %err, "mark_result failed");
                }
            }
        }
        Ok(report)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
