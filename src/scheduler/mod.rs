pub mod log;
pub mod store;

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{FixedOffset, Utc};
use croner::Cron;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::pipeline::{Pipeline, PipelineOutcome};

use self::log::{ExecutionLog, ExecutionLogEntry, ExecutionStatus};
use self::store::{DayOfWeek, JobStore, ScheduleEntry};

/// All schedules are evaluated in Korea Standard Time (no DST).
fn schedule_tz() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("KST offset is valid")
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("hour must be in 0-23 and minute in 0-59 (got {hour:02}:{minute:02})")]
    InvalidTime { hour: u32, minute: u32 },
    #[error("weekly schedules need at least one day")]
    EmptyDays,
    #[error("invalid cron expression '{expr}': {message}")]
    InvalidSchedule { expr: String, message: String },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Process-scoped recurring-job engine. Live triggers are a rebuildable
/// cache of the JobStore: `restore` reconstructs them once per process,
/// and registering an id that is already live replaces the old trigger.
///
/// Lifecycle: `new` -> `restore` -> any number of `add`/`remove` -> `shutdown`.
pub struct Scheduler {
    store: Arc<JobStore>,
    log: Arc<ExecutionLog>,
    pipeline: Arc<dyn Pipeline>,
    triggers: Mutex<HashMap<String, JoinHandle<()>>>,
    restored: AtomicBool,
}

impl Scheduler {
    pub fn new(store: Arc<JobStore>, log: Arc<ExecutionLog>, pipeline: Arc<dyn Pipeline>) -> Self {
        Self {
            store,
            log,
            pipeline,
            triggers: Mutex::new(HashMap::new()),
            restored: AtomicBool::new(false),
        }
    }

    /// Rebuild live triggers from the JobStore. Runs at most once per
    /// process; later calls are no-ops. Entries that fail to register are
    /// skipped, never fatal. Returns the number of triggers armed.
    pub async fn restore(&self) -> usize {
        if self
            .restored
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Schedules already restored, skipping");
            return 0;
        }

        let entries = match self.store.load() {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load schedule store");
                return 0;
            }
        };

        let mut restored = 0;
        for entry in entries {
            match self.register_trigger(&entry).await {
                Ok(()) => {
                    tracing::info!(schedule = %entry.id, keyword = %entry.keyword, "Restored schedule");
                    restored += 1;
                }
                Err(e) => {
                    tracing::error!(schedule = %entry.id, error = %e, "Failed to restore schedule");
                }
            }
        }

        tracing::info!(count = restored, "Schedule restore complete");
        restored
    }

    /// Register a new recurring scrape: arm the trigger, then persist the
    /// entry. If persisting fails the just-armed trigger is torn down, so
    /// the store and the live set never drift apart.
    pub async fn add(
        &self,
        keyword: &str,
        hour: u32,
        minute: u32,
        days_of_week: Option<Vec<DayOfWeek>>,
    ) -> Result<ScheduleEntry, ScheduleError> {
        if hour > 23 || minute > 59 {
            return Err(ScheduleError::InvalidTime { hour, minute });
        }
        if matches!(&days_of_week, Some(days) if days.is_empty()) {
            return Err(ScheduleError::EmptyDays);
        }

        let entry = ScheduleEntry::new(keyword, hour, minute, days_of_week);
        self.register_trigger(&entry).await?;

        if let Err(e) = self.store.add(entry.clone()).await {
            self.deregister_trigger(&entry.id).await;
            return Err(ScheduleError::Store(e));
        }

        tracing::info!(
            schedule = %entry.id,
            keyword = %entry.keyword,
            at = %format!("{:02}:{:02}", entry.hour, entry.minute),
            frequency = %entry.frequency_label,
            "Schedule added"
        );
        Ok(entry)
    }

    /// Remove a schedule. An id that was never added returns `Ok(false)`
    /// without mutating the store. If persisting the removal fails, the
    /// trigger is re-armed from its snapshot and the error propagates.
    pub async fn remove(&self, id: &str) -> Result<bool, ScheduleError> {
        let Some(snapshot) = self.store.get(id).await? else {
            return Ok(false);
        };

        self.deregister_trigger(id).await;

        match self.store.remove(id).await {
            Ok(removed) => {
                tracing::info!(schedule = %id, "Schedule removed");
                Ok(removed)
            }
            Err(e) => {
                if let Err(re) = self.register_trigger(&snapshot).await {
                    tracing::error!(schedule = %id, error = %re, "Failed to re-arm trigger after store failure");
                }
                Err(ScheduleError::Store(e))
            }
        }
    }

    /// Ids with a live trigger, unordered.
    pub async fn active_trigger_ids(&self) -> Vec<String> {
        self.triggers.lock().await.keys().cloned().collect()
    }

    /// Abort every live trigger. The JobStore is untouched; a later
    /// process restores from it.
    pub async fn shutdown(&self) {
        let mut triggers = self.triggers.lock().await;
        for (id, handle) in triggers.drain() {
            handle.abort();
            tracing::debug!(schedule = %id, "Trigger stopped");
        }
    }

    /// Arm a trigger under the entry's id. Replace semantics: an already
    /// live trigger under the same id is aborted first, never duplicated.
    async fn register_trigger(&self, entry: &ScheduleEntry) -> Result<(), ScheduleError> {
        let expr = entry.cron_expr();
        let cron = Cron::new(&expr)
            .parse()
            .map_err(|e| ScheduleError::InvalidSchedule {
                expr: expr.clone(),
                message: e.to_string(),
            })?;

        let schedule_id = entry.id.clone();
        let keyword = entry.keyword.clone();
        let pipeline = self.pipeline.clone();
        let log = self.log.clone();

        let handle = tokio::spawn(async move {
            trigger_loop(&schedule_id, &keyword, cron, pipeline, log).await;
        });

        let mut triggers = self.triggers.lock().await;
        if let Some(old) = triggers.insert(entry.id.clone(), handle) {
            old.abort();
            tracing::debug!(schedule = %entry.id, "Replaced existing trigger");
        }
        Ok(())
    }

    async fn deregister_trigger(&self, id: &str) {
        if let Some(handle) = self.triggers.lock().await.remove(id) {
            handle.abort();
        }
    }
}

/// Sleep-until-next loop for one schedule. Fires are awaited in place, so
/// a schedule can never overlap its own previous run; distinct schedules
/// run independently.
async fn trigger_loop(
    schedule_id: &str,
    keyword: &str,
    cron: Cron,
    pipeline: Arc<dyn Pipeline>,
    log: Arc<ExecutionLog>,
) {
    tracing::info!(schedule = %schedule_id, keyword = %keyword, "Trigger armed");

    loop {
        let now = Utc::now().with_timezone(&schedule_tz());
        let next = match cron.find_next_occurrence(&now, false) {
            Ok(next) => next,
            Err(e) => {
                tracing::error!(schedule = %schedule_id, error = %e, "Failed to compute next occurrence");
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                continue;
            }
        };

        let duration = (next - now)
            .to_std()
            .unwrap_or(std::time::Duration::from_secs(1));
        tracing::info!(
            schedule = %schedule_id,
            next = %next.format("%Y-%m-%d %H:%M:%S %z"),
            "Sleeping until next fire"
        );
        tokio::time::sleep(duration).await;

        // Guard against premature wake from sleep imprecision
        let now_after = Utc::now().with_timezone(&schedule_tz());
        if now_after < next {
            let remaining = (next - now_after).to_std().unwrap_or_default();
            tokio::time::sleep(remaining).await;
        }

        fire(schedule_id, keyword, pipeline.as_ref(), &log).await;
    }
}

/// Run the pipeline for one scheduled fire and record exactly one log
/// entry. Every failure mode is absorbed here; nothing may escape and
/// kill the trigger loop or its siblings.
async fn fire(schedule_id: &str, keyword: &str, pipeline: &dyn Pipeline, log: &ExecutionLog) {
    tracing::info!(schedule = %schedule_id, keyword = %keyword, "Scheduled fire starting");

    let label = format!("[scheduled] {keyword} news");
    let (status, page_url) = match pipeline.run(&label, keyword).await {
        Ok(PipelineOutcome::Published { url, .. }) => (ExecutionStatus::Success, url),
        Ok(PipelineOutcome::PublishFailed { .. }) => (ExecutionStatus::Failure, None),
        Ok(PipelineOutcome::NoResults) => (ExecutionStatus::NoResults, None),
        Err(e) => (
            ExecutionStatus::Error {
                detail: format!("{e:#}"),
            },
            None,
        ),
    };

    tracing::info!(schedule = %schedule_id, status = ?status, "Scheduled fire finished");

    let entry = ExecutionLogEntry::new(schedule_id, keyword, status, page_url);
    if let Err(e) = log.append(entry).await {
        tracing::error!(schedule = %schedule_id, error = %e, "Failed to append execution log entry");
    }
}
