use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    /// Token accepted by cron expressions.
    pub fn cron_token(&self) -> &'static str {
        match self {
            DayOfWeek::Mon => "MON",
            DayOfWeek::Tue => "TUE",
            DayOfWeek::Wed => "WED",
            DayOfWeek::Thu => "THU",
            DayOfWeek::Fri => "FRI",
            DayOfWeek::Sat => "SAT",
            DayOfWeek::Sun => "SUN",
        }
    }
}

impl std::fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cron_token().to_lowercase())
    }
}

/// One durable recurring scrape definition. The id doubles as the key of
/// the live trigger, which is what makes re-registration replace rather
/// than duplicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: String,
    pub keyword: String,
    pub hour: u32,
    pub minute: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days_of_week: Option<Vec<DayOfWeek>>,
    pub frequency_label: String,
    pub created_at: DateTime<Utc>,
}

impl ScheduleEntry {
    /// Build a fresh entry with a unique, time-derived id and a derived
    /// display label. Field validation is the scheduler's responsibility.
    pub fn new(
        keyword: impl Into<String>,
        hour: u32,
        minute: u32,
        days_of_week: Option<Vec<DayOfWeek>>,
    ) -> Self {
        let now = Utc::now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("schedule_{}_{}", now.format("%Y%m%d_%H%M%S"), &suffix[..6]);

        let frequency_label = match &days_of_week {
            Some(days) => {
                let names: Vec<String> = days.iter().map(|d| d.to_string()).collect();
                format!("weekly on {}", names.join(", "))
            }
            None => "daily".to_string(),
        };

        Self {
            id,
            keyword: keyword.into(),
            hour,
            minute,
            days_of_week,
            frequency_label,
            created_at: now,
        }
    }

    /// Five-field cron expression for this entry's recurrence.
    pub fn cron_expr(&self) -> String {
        let days = match &self.days_of_week {
            Some(days) => days
                .iter()
                .map(|d| d.cron_token())
                .collect::<Vec<_>>()
                .join(","),
            None => "*".to_string(),
        };
        format!("{} {} * * {}", self.minute, self.hour, days)
    }
}

/// Durable collection of schedule definitions, stored as a JSON array and
/// rewritten whole on every change. The scheduler's live triggers are a
/// rebuildable cache of this store, never the other way around.
pub struct JobStore {
    path: PathBuf,
    // load-modify-save is a critical section; concurrent whole-collection
    // overwrites would lose updates.
    write_lock: Mutex<()>,
}

impl JobStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn load(&self) -> Result<Vec<ScheduleEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read schedule file: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse schedule file: {}", self.path.display()))
    }

    pub fn save(&self, entries: &[ScheduleEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create data directory: {}", parent.display())
            })?;
        }
        let content =
            serde_json::to_string_pretty(entries).context("failed to serialize schedules")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("failed to write schedule file: {}", self.path.display()))
    }

    pub async fn add(&self, entry: ScheduleEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load()?;
        entries.push(entry);
        self.save(&entries)
    }

    /// Filter the id out of the durable collection. Returns whether the id
    /// was present; an absent id does not rewrite the file.
    pub async fn remove(&self, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }

    pub async fn get(&self, id: &str) -> Result<Option<ScheduleEntry>> {
        Ok(self.load()?.into_iter().find(|e| e.id == id))
    }
}
