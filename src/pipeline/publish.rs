use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Card, MAX_ITEMS};
use crate::config::NotionConfig;

const NOTION_API_VERSION: &str = "2022-06-28";
const NOTION_PAGES_URL: &str = "https://api.notion.com/v1/pages";
const MAX_DIAGNOSTICS: usize = 50;

/// Outcome of a publish attempt: whether the store accepted the document,
/// and the shareable reference URL when it returned one.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub success: bool,
    pub url: Option<String>,
}

impl PublishResult {
    fn failed() -> Self {
        Self {
            success: false,
            url: None,
        }
    }
}

/// Persists a summarized bundle as a document in an external store. Never
/// fails outward; failures are reported through the result and the
/// in-session diagnostic trail.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, request_label: &str, keyword: &str, cards: &[Card]) -> PublishResult;

    /// Human-readable in-session trail of publish attempts, newest last.
    fn diagnostics(&self) -> Vec<String>;
}

/// Bounded in-session trail of publish attempts. Separate from the durable
/// execution log.
pub struct DiagnosticLog {
    entries: Mutex<VecDeque<String>>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push(&self, message: impl Into<String>) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push_back(message.into());
        while entries.len() > MAX_DIAGNOSTICS {
            entries.pop_front();
        }
    }

    pub fn entries(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().cloned().collect()
    }
}

pub struct NotionPublisher {
    http_client: Arc<reqwest::Client>,
    config: Option<NotionConfig>,
    diagnostics: DiagnosticLog,
}

impl NotionPublisher {
    pub fn new(http_client: Arc<reqwest::Client>, config: Option<NotionConfig>) -> Self {
        Self {
            http_client,
            config,
            diagnostics: DiagnosticLog::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn try_publish(
        &self,
        request_label: &str,
        keyword: &str,
        cards: &[Card],
    ) -> Result<Option<String>> {
        let config = self
            .config
            .as_ref()
            .context("Notion API key or database id is not configured")?;

        let body = page_payload(&config.database_id, request_label, keyword, cards);

        let response = self
            .http_client
            .post(NOTION_PAGES_URL)
            .header("Authorization", format!("Bearer {}", config.api_key))
            .header("Notion-Version", NOTION_API_VERSION)
            .json(&body)
            .send()
            .await
            .context("failed to create Notion page")?;

        let status = response.status();
        let resp_body: Value = response
            .json()
            .await
            .context("failed to parse Notion API response")?;

        if !status.is_success() {
            let msg = resp_body["message"].as_str().unwrap_or("unknown error");
            anyhow::bail!("Notion API returned {status}: {msg}");
        }

        Ok(resp_body["url"]
            .as_str()
            .map(|url| to_public_url(url, config.public_domain.as_deref())))
    }
}

#[async_trait]
impl Publisher for NotionPublisher {
    async fn publish(&self, request_label: &str, keyword: &str, cards: &[Card]) -> PublishResult {
        match self.try_publish(request_label, keyword, cards).await {
            Ok(url) => {
                tracing::info!(keyword = %keyword, url = ?url, "Notion page created");
                self.diagnostics.push("Notion page created");
                PublishResult { success: true, url }
            }
            Err(e) => {
                tracing::error!(keyword = %keyword, error = %e, "Notion publish failed");
                self.diagnostics.push(format!("Notion publish failed: {e:#}"));
                PublishResult::failed()
            }
        }
    }

    fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.entries()
    }
}

fn page_payload(database_id: &str, request_label: &str, keyword: &str, cards: &[Card]) -> Value {
    json!({
        "parent": { "database_id": database_id },
        "properties": {
            "Title": { "title": [{ "text": { "content": request_label } }] },
            "Keyword": { "rich_text": [{ "text": { "content": keyword } }] },
            "Date": { "date": { "start": chrono::Local::now().date_naive().to_string() } },
        },
        "children": card_blocks(cards),
    })
}

/// One heading + one summary paragraph + one link paragraph per card, in
/// input order, capped at the pipeline fan-out limit.
fn card_blocks(cards: &[Card]) -> Vec<Value> {
    let mut blocks = Vec::with_capacity(cards.len().min(MAX_ITEMS) * 3);

    for (idx, card) in cards.iter().take(MAX_ITEMS).enumerate() {
        blocks.push(json!({
            "object": "block",
            "type": "heading_2",
            "heading_2": {
                "rich_text": [{
                    "type": "text",
                    "text": { "content": format!("{}. {}", idx + 1, card.title) }
                }]
            }
        }));
        blocks.push(json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": {
                "rich_text": [{ "type": "text", "text": { "content": card.summary } }]
            }
        }));
        blocks.push(json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": {
                "rich_text": [{
                    "type": "text",
                    "text": {
                        "content": "Read the full article",
                        "link": { "url": card.link }
                    }
                }]
            }
        }));
    }

    blocks
}

/// Rewrite a notion.so URL onto the configured public domain. Unknown
/// shapes and a missing domain pass through unchanged.
fn to_public_url(url: &str, public_domain: Option<&str>) -> String {
    let Some(domain) = public_domain else {
        return url.to_string();
    };
    match url.split_once("notion.so/") {
        Some((_, page_path)) => format!("{}/{}", domain.trim_end_matches('/'), page_path),
        None => url.to_string(),
    }
}
