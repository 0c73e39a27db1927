//! Scheduling business rules.
//!
//! The verdict gate, the one-active-slot rule, default cadence slotting,
//! and the due handoff all run inside single store transactions, so the
//! state machine never exposes half-applied transitions.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use sentinel_core::{linear_backoff_delay, ContentId, EntryId, Platform, Result, SentinelError};
use sentinel_guard::{VerdictRepo, VerdictStatus};
use sentinel_settings::SchedulerSettings;
use sentinel_store::Store;

use crate::repository::ScheduleRepo;
use crate::types::{EntryState, PublishOutcome, ScheduleEntry};

/// Schedule state machine over one store.
pub struct Scheduler {
    store: Arc<Store>,
    settings: SchedulerSettings,
}

impl Scheduler {
    #[must_use]
    pub fn new(store: Arc<Store>, settings: SchedulerSettings) -> Self {
        Self { store, settings }
    }

    /// Plan a publish action.
    ///
    /// Fails with a policy error when the item is quarantined or was never
    /// screened — the verdict gate is hard, and absence of a verdict is
    /// treated as the conservative case. Fails with a duplicate error,
    /// carrying the existing entry id, when an active entry already holds
    /// the (content, platform) slot.
    pub fn schedule(
        &self,
        content_id: &ContentId,
        platform: Platform,
        requested_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduleEntry> {
        let now = Utc::now();
        let settings = self.settings.clone();
        let content_id = content_id.clone();

        let entry = self.store.write(move |tx| {
            match VerdictRepo::latest(tx, &content_id)? {
                None => {
                    return Err(SentinelError::policy(
                        content_id.as_str(),
                        "content has never been screened",
                    ));
                }
                Some(v) if v.status.blocks_scheduling() => {
                    return Err(SentinelError::policy(
                        content_id.as_str(),
                        "content is quarantined",
                    ));
                }
                Some(_) => {}
            }

            if let Some(existing) = ScheduleRepo::active_for(tx, &content_id, platform)? {
                return Err(SentinelError::Duplicate {
                    content_id: content_id.as_str().to_string(),
                    platform: platform.as_str().to_string(),
                    existing: existing.id.as_str().to_string(),
                });
            }

            let planned_at = match requested_at {
                Some(at) => at,
                None => default_slot(tx, platform, now, &settings)?,
            };

            let entry = ScheduleEntry {
                id: EntryId::new(),
                content_id: content_id.clone(),
                platform,
                planned_at,
                state: EntryState::Pending,
                attempts: 0,
                created_at: now,
                updated_at: now,
            };
            ScheduleRepo::insert(tx, &entry)?;
            Ok(entry)
        })?;

        info!(
            entry_id = %entry.id,
            content_id = %entry.content_id,
            platform = %entry.platform,
            planned_at = %entry.planned_at,
            "entry scheduled"
        );
        Ok(entry)
    }

    /// Hand off every pending entry whose slot has arrived.
    ///
    /// The returned entries are in state `due`; the select and the flips
    /// commit atomically, so no entry is handed to two consumers.
    pub fn due_entries(&self, now: DateTime<Utc>) -> Result<Vec<ScheduleEntry>> {
        let claimed = self.store.write(move |tx| ScheduleRepo::claim_due(tx, now))?;
        debug!(claimed = claimed.len(), "due handoff");
        Ok(claimed)
    }

    /// Record the outcome of a publish attempt for a due entry.
    ///
    /// Success terminates at `published`. A retryable failure increments the
    /// attempt count and parks the entry back at `pending` with a linearly
    /// backed-off slot, so the next due handoff re-claims it atomically,
    /// until the bound moves the entry to `skipped`. A non-retryable failure
    /// parks the entry at `failed` immediately.
    pub fn mark_result(&self, entry_id: &EntryId, outcome: PublishOutcome) -> Result<ScheduleEntry> {
        let now = Utc::now();
        let settings = self.settings.clone();
        let entry_id = entry_id.clone();

        let entry = self.store.write(move |tx| {
            let mut entry = ScheduleRepo::get(tx, &entry_id)?.ok_or_else(|| {
                SentinelError::Validation(format!("no schedule entry {entry_id}"))
            })?;
            if entry.state != EntryState::Due {
                return Err(SentinelError::Validation(format!(
                    "entry {entry_id} is {}, not due",
                    entry.state.as_str()
                )));
            }

            match outcome {
                PublishOutcome::Published => {
                    entry.state = EntryState::Published;
                }
                PublishOutcome::Failed { retryable: false } => {
                    entry.attempts += 1;
                    entry.state = EntryState::Failed;
                }
                PublishOutcome::Failed { retryable: true } => {
                    entry.attempts += 1;
                    if entry.attempts >= settings.max_attempts {
                        entry.state = EntryState::Skipped;
                    } else {
                        // back to pending so the next claim pass is the only
                        // handoff; the slot is pushed out linearly per attempt
                        entry.state = EntryState::Pending;
                        entry.planned_at = now
                            + Duration::seconds(linear_backoff_delay(
                                settings.retry_backoff_secs,
                                entry.attempts,
                            ));
                    }
                }
            }
            entry.updated_at = now;
            ScheduleRepo::persist_transition(tx, &entry)?;
            Ok(entry)
        })?;

        match entry.state {
            EntryState::Published => {
                info!(entry_id = %entry.id, "entry published");
            }
            EntryState::Skipped | EntryState::Failed => {
                warn!(
                    entry_id = %entry.id,
                    state = entry.state.as_str(),
                    attempts = entry.attempts,
                    "entry abandoned"
                );
            }
            _ => {
                debug!(
                    entry_id = %entry.id,
                    attempts = entry.attempts,
                    retry_at = %entry.planned_at,
                    "entry retry scheduled"
                );
            }
        }
        Ok(entry)
    }

    /// Revive a skipped or failed entry back to `pending`.
    ///
    /// The attempt counter resets; the new slot is explicit or immediate.
    pub fn reschedule(
        &self,
        entry_id: &EntryId,
        planned_at: Option<DateTime<Utc>>,
    ) -> Result<ScheduleEntry> {
        let now = Utc::now();
        let entry_id = entry_id.clone();

        let entry = self.store.write(move |tx| {
            let mut entry = ScheduleRepo::get(tx, &entry_id)?.ok_or_else(|| {
                SentinelError::Validation(format!("no schedule entry {entry_id}"))
            })?;
            if !matches!(entry.state, EntryState::Skipped | EntryState::Failed) {
                return Err(SentinelError::Validation(format!(
                    "entry {entry_id} is {}, only skipped or failed entries can be rescheduled",
                    entry.state.as_str()
                )));
            }
            entry.state = EntryState::Pending;
            entry.attempts = 0;
            entry.planned_at = planned_at.unwrap_or(now);
            entry.updated_at = now;
            ScheduleRepo::persist_transition(tx, &entry)?;
            Ok(entry)
        })?;

        info!(entry_id = %entry.id, planned_at = %entry.planned_at, "entry revived");
        Ok(entry)
    }

    /// All entries, planned time ascending.
    pub fn list(&self) -> Result<Vec<ScheduleEntry>> {
        self.store.read(|conn| ScheduleRepo::list(conn))
    }
}

/// Default slot when the caller gives no time: spread entries on one
/// platform a cadence apart, staggered across platforms so the four
/// simulators never burst together.
fn default_slot(
    conn: &rusqlite::Connection,
    platform: Platform,
    now: DateTime<Utc>,
    settings: &SchedulerSettings,
) -> Result<DateTime<Utc>> {
    let queued = ScheduleRepo::count_active_on(conn, platform)?;
    let cadence = Duration::seconds(settings.cadence_secs * (queued + 1));
    let stagger = Duration::seconds(
        settings.stagger_secs * i64::try_from(platform.index()).unwrap_or(0),
    );
    Ok(now + cadence + stagger)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sentinel_guard::{SecurityVerdict, VerdictRepo};
    use sentinel_store::ConnectionConfig;

    fn setup() -> (Scheduler, Arc<Store>, tempfile::TempDir) {
        setup_with(SchedulerSettings::default())
    }

    fn setup_with(settings: SchedulerSettings) -> (Scheduler, Arc<Store>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            Store::open(&dir.path().join("test.db"), &ConnectionConfig::default()).unwrap(),
        );
        let scheduler = Scheduler::new(Arc::clone(&store), settings);
        (scheduler, store, dir)
    }

    fn screen_as(store: &Store, id: &str, status: VerdictStatus) {
        store
            .write(|tx| {
                VerdictRepo::upsert(
                    tx,
                    &SecurityVerdict {
                        content_id: ContentId::from(id),
                        status,
                        reasons: Vec::new(),
                        scanned_at: Utc::now(),
                    },
                )
            })
            .unwrap();
    }

    #[test]
    fn quarantined_content_never_schedules() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "c1", VerdictStatus::Quarantined);
        let result = scheduler.schedule(&ContentId::from("c1"), Platform::Twitter, None);
        assert_matches!(result, Err(SentinelError::Policy { .. }));
        assert!(scheduler.list().unwrap().is_empty());
    }

    #[test]
    fn unscreened_content_never_schedules() {
        let (scheduler, _store, _dir) = setup();
        let result = scheduler.schedule(&ContentId::from("ghost"), Platform::Twitter, None);
        assert_matches!(result, Err(SentinelError::Policy { .. }));
    }

    #[test]
    fn flagged_content_is_schedulable() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "c1", VerdictStatus::Flagged);
        let entry = scheduler
            .schedule(&ContentId::from("c1"), Platform::Twitter, None)
            .unwrap();
        assert_eq!(entry.state, EntryState::Pending);
    }

    #[test]
    fn duplicate_schedule_returns_the_existing_entry_id() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "c1", VerdictStatus::Clean);
        let first = scheduler
            .schedule(&ContentId::from("c1"), Platform::Twitter, None)
            .unwrap();
        let result = scheduler.schedule(&ContentId::from("c1"), Platform::Twitter, None);
        assert_matches!(
            result,
            Err(SentinelError::Duplicate { existing, .. }) if existing == first.id.as_str()
        );
    }

    #[test]
    fn same_content_on_another_platform_is_not_a_duplicate() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "c1", VerdictStatus::Clean);
        let _ = scheduler
            .schedule(&ContentId::from("c1"), Platform::Twitter, None)
            .unwrap();
        let entry = scheduler
            .schedule(&ContentId::from("c1"), Platform::Linkedin, None)
            .unwrap();
        assert_eq!(entry.platform, Platform::Linkedin);
    }

    #[test]
    fn explicit_slot_wins_over_cadence() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "c1", VerdictStatus::Clean);
        let at = Utc::now() + Duration::seconds(10);
        let entry = scheduler
            .schedule(&ContentId::from("c1"), Platform::Twitter, Some(at))
            .unwrap();
        assert_eq!(entry.planned_at, at);
    }

    #[test]
    fn default_cadence_spreads_a_platform_queue() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "c1", VerdictStatus::Clean);
        screen_as(&store, "c2", VerdictStatus::Clean);
        let first = scheduler
            .schedule(&ContentId::from("c1"), Platform::Twitter, None)
            .unwrap();
        let second = scheduler
            .schedule(&ContentId::from("c2"), Platform::Twitter, None)
            .unwrap();
        let gap = second.planned_at - first.planned_at;
        assert!(gap >= Duration::seconds(SchedulerSettings::default().cadence_secs - 1));
    }

    #[test]
    fn due_handoff_scenario() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "a", VerdictStatus::Clean);
        let t0 = Utc::now();
        let entry = scheduler
            .schedule(&ContentId::from("a"), Platform::Twitter, Some(t0 + Duration::seconds(10)))
            .unwrap();

        assert!(scheduler.due_entries(t0 + Duration::seconds(5)).unwrap().is_empty());
        let due = scheduler.due_entries(t0 + Duration::seconds(11)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, entry.id);
        assert_eq!(due[0].state, EntryState::Due);

        // no double handoff without an intervening mark_result
        assert!(scheduler.due_entries(t0 + Duration::seconds(11)).unwrap().is_empty());
    }

    #[test]
    fn three_transport_faults_skip_the_entry() {
        let settings = SchedulerSettings {
            retry_backoff_secs: 0,
            ..SchedulerSettings::default()
        };
        let (scheduler, store, _dir) = setup_with(settings);
        screen_as(&store, "a", VerdictStatus::Clean);
        let t0 = Utc::now() - Duration::seconds(1);
        let entry = scheduler
            .schedule(&ContentId::from("a"), Platform::Twitter, Some(t0))
            .unwrap();
        let _ = scheduler.due_entries(Utc::now()).unwrap();

        let failed = PublishOutcome::Failed { retryable: true };
        let after_1 = scheduler.mark_result(&entry.id, failed).unwrap();
        assert_eq!(after_1.state, EntryState::Pending);
        assert_eq!(after_1.attempts, 1);

        // a pending retry must be re-claimed before the next result report
        assert_matches!(
            scheduler.mark_result(&entry.id, failed),
            Err(SentinelError::Validation(_))
        );

        let _ = scheduler.due_entries(Utc::now() + Duration::seconds(1)).unwrap();
        let after_2 = scheduler.mark_result(&entry.id, failed).unwrap();
        assert_eq!(after_2.state, EntryState::Pending);
        // linear backoff grows with the attempt count
        assert!(after_2.planned_at >= after_1.planned_at);

        let _ = scheduler.due_entries(Utc::now() + Duration::seconds(1)).unwrap();
        let after_3 = scheduler.mark_result(&entry.id, failed).unwrap();
        assert_eq!(after_3.state, EntryState::Skipped);
        assert_eq!(after_3.attempts, 3);

        // terminal: a further result report is rejected
        assert_matches!(
            scheduler.mark_result(&entry.id, failed),
            Err(SentinelError::Validation(_))
        );
    }

    #[test]
    fn a_ripe_retry_is_handed_off_exactly_once() {
        let settings = SchedulerSettings {
            retry_backoff_secs: 0,
            ..SchedulerSettings::default()
        };
        let (scheduler, store, _dir) = setup_with(settings);
        screen_as(&store, "a", VerdictStatus::Clean);
        let entry = scheduler
            .schedule(
                &ContentId::from("a"),
                Platform::Twitter,
                Some(Utc::now() - Duration::seconds(1)),
            )
            .unwrap();
        let _ = scheduler.due_entries(Utc::now()).unwrap();

        let parked = scheduler
            .mark_result(&entry.id, PublishOutcome::Failed { retryable: true })
            .unwrap();
        assert_eq!(parked.state, EntryState::Pending);

        // two consumers race for the ripe retry; only the first claim wins
        let later = Utc::now() + Duration::seconds(1);
        let first = scheduler.due_entries(later).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, entry.id);
        assert!(scheduler.due_entries(later).unwrap().is_empty());
    }

    #[test]
    fn non_retryable_failure_parks_at_failed() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "a", VerdictStatus::Clean);
        let entry = scheduler
            .schedule(
                &ContentId::from("a"),
                Platform::Twitter,
                Some(Utc::now() - Duration::seconds(1)),
            )
            .unwrap();
        let _ = scheduler.due_entries(Utc::now()).unwrap();

        let after = scheduler
            .mark_result(&entry.id, PublishOutcome::Failed { retryable: false })
            .unwrap();
        assert_eq!(after.state, EntryState::Failed);
    }

    #[test]
    fn mark_result_success_publishes() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "a", VerdictStatus::Clean);
        let entry = scheduler
            .schedule(
                &ContentId::from("a"),
                Platform::Twitter,
                Some(Utc::now() - Duration::seconds(1)),
            )
            .unwrap();
        let _ = scheduler.due_entries(Utc::now()).unwrap();
        let after = scheduler
            .mark_result(&entry.id, PublishOutcome::Published)
            .unwrap();
        assert_eq!(after.state, EntryState::Published);
    }

    #[test]
    fn reschedule_revives_a_skipped_entry() {
        let settings = SchedulerSettings {
            retry_backoff_secs: 0,
            ..SchedulerSettings::default()
        };
        let (scheduler, store, _dir) = setup_with(settings);
        screen_as(&store, "a", VerdictStatus::Clean);
        let entry = scheduler
            .schedule(
                &ContentId::from("a"),
                Platform::Twitter,
                Some(Utc::now() - Duration::seconds(1)),
            )
            .unwrap();
        let failed = PublishOutcome::Failed { retryable: true };
        for _ in 0..3 {
            let _ = scheduler.due_entries(Utc::now() + Duration::seconds(1)).unwrap();
            let _ = scheduler.mark_result(&entry.id, failed).unwrap();
        }

        let revived = scheduler.reschedule(&entry.id, None).unwrap();
        assert_eq!(revived.state, EntryState::Pending);
        assert_eq!(revived.attempts, 0);
    }

    #[test]
    fn reschedule_rejects_active_and_published_entries() {
        let (scheduler, store, _dir) = setup();
        screen_as(&store, "a", VerdictStatus::Clean);
        let entry = scheduler
            .schedule(&ContentId::from("a"), Platform::Twitter, None)
            .unwrap();
        assert_matches!(
            scheduler.reschedule(&entry.id, None),
            Err(SentinelError::Validation(_))
        );
    }
}
