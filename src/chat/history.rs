use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Conversation transcript persisted as a JSON array: loaded once at
/// startup, rewritten after every turn.
pub struct ChatHistory {
    path: PathBuf,
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn load(path: PathBuf) -> Result<Self> {
        let turns = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read chat history: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse chat history: {}", path.display()))?
        } else {
            Vec::new()
        };
        Ok(Self { path, turns })
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn push(&mut self, turn: ChatTurn) -> Result<()> {
        self.turns.push(turn);
        self.save()
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create data directory: {}", parent.display())
            })?;
        }
        let content =
            serde_json::to_string_pretty(&self.turns).context("failed to serialize chat history")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("failed to write chat history: {}", self.path.display()))
    }
}
