use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// The persisted log keeps only the most recent runs; older entries are
/// silently dropped past this cap.
pub const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    Failure,
    NoResults,
    Error { detail: String },
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Success => write!(f, "success"),
            ExecutionStatus::Failure => write!(f, "failure"),
            ExecutionStatus::NoResults => write!(f, "no results"),
            ExecutionStatus::Error { detail } => write!(f, "error: {detail}"),
        }
    }
}

/// One recorded pipeline run, manual or scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub schedule_id: String,
    pub keyword: String,
    #[serde(flatten)]
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionLogEntry {
    pub fn new(
        schedule_id: impl Into<String>,
        keyword: impl Into<String>,
        status: ExecutionStatus,
        page_url: Option<String>,
    ) -> Self {
        Self {
            schedule_id: schedule_id.into(),
            keyword: keyword.into(),
            status,
            page_url,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only, capped history of pipeline runs, stored as a JSON array
/// rewritten on every append.
pub struct ExecutionLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ExecutionLog {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Vec<ExecutionLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read execution log: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse execution log: {}", self.path.display()))
    }

    pub async fn append(&self, entry: ExecutionLogEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load()?;
        entries.push(entry);
        if entries.len() > MAX_LOG_ENTRIES {
            entries.drain(..entries.len() - MAX_LOG_ENTRIES);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create data directory: {}", parent.display())
            })?;
        }
        let content =
            serde_json::to_string_pretty(&entries).context("failed to serialize execution log")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("failed to write execution log: {}", self.path.display()))
    }

    /// The most recent entries, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>> {
        let _guard = self.write_lock.lock().await;
        let entries = self.load()?;
        Ok(entries.into_iter().rev().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn log_in(dir: &std::path::Path) -> ExecutionLog {
        ExecutionLog::new(dir.join("execution_log.json"))
    }

    fn entry(schedule_id: &str, status: ExecutionStatus) -> ExecutionLogEntry {
        ExecutionLogEntry::new(schedule_id, "AI", status, None)
    }

    #[tokio::test]
    async fn test_append_and_recent_newest_first() {
        let dir = tempdir().unwrap();
        let log = log_in(dir.path());

        log.append(entry("s1", ExecutionStatus::Success)).await.unwrap();
        log.append(entry("s2", ExecutionStatus::NoResults)).await.unwrap();
        log.append(entry("s3", ExecutionStatus::Failure)).await.unwrap();

        let recent = log.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].schedule_id, "s3");
        assert_eq!(recent[1].schedule_id, "s2");
    }

    #[tokio::test]
    async fn test_log_never_exceeds_cap_and_drops_oldest() {
        let dir = tempdir().unwrap();
        let log = log_in(dir.path());

        for i in 0..(MAX_LOG_ENTRIES + 10) {
            log.append(entry(&format!("s{i}"), ExecutionStatus::Success))
                .await
                .unwrap();
        }

        let all = log.recent(usize::MAX).await.unwrap();
        assert_eq!(all.len(), MAX_LOG_ENTRIES);
        // Newest first: the last append is first, the first ten are gone.
        assert_eq!(all[0].schedule_id, format!("s{}", MAX_LOG_ENTRIES + 9));
        assert_eq!(all.last().unwrap().schedule_id, "s10");
    }

    #[tokio::test]
    async fn test_survives_reload() {
        let dir = tempdir().unwrap();
        {
            let log = log_in(dir.path());
            log.append(entry("s1", ExecutionStatus::Success)).await.unwrap();
        }
        let log = log_in(dir.path());
        let recent = log.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].schedule_id, "s1");
    }

    #[test]
    fn test_status_serde_shapes() {
        let success = serde_json::to_value(ExecutionStatus::Success).unwrap();
        assert_eq!(success["status"], "success");

        let no_results = serde_json::to_value(ExecutionStatus::NoResults).unwrap();
        assert_eq!(no_results["status"], "no_results");

        let error = serde_json::to_value(ExecutionStatus::Error {
            detail: "feed exploded".to_string(),
        })
        .unwrap();
        assert_eq!(error["status"], "error");
        assert_eq!(error["detail"], "feed exploded");
    }

    #[test]
    fn test_entry_serde_roundtrip_with_flattened_status() {
        let original = ExecutionLogEntry::new(
            "s1",
            "AI",
            ExecutionStatus::Error {
                detail: "boom".to_string(),
            },
            Some("https://example.notion.site/page".to_string()),
        );
        let json = serde_json::to_string(&original).unwrap();
        let parsed: ExecutionLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, original);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["schedule_id"], "s1");
    }
}
