use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use scraper::{Html, Selector};

use super::NewsItem;

/// Per-article fetch budget. One slow site must not hold the batch hostage
/// longer than this.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// Retrieves the readable text of a single page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

pub struct HttpPageFetcher {
    http_client: Arc<reqwest::Client>,
}

impl HttpPageFetcher {
    pub fn new(http_client: Arc<reqwest::Client>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let html = self
            .http_client
            .get(url)
            .header("User-Agent", "Mozilla/5.0 (compatible; Newsdesk/1.0)")
            .send()
            .await
            .context("failed to fetch article page")?
            .error_for_status()
            .with_context(|| format!("article page returned error status: {url}"))?
            .text()
            .await
            .context("failed to read article page body")?;

        Ok(extract_paragraphs(&html))
    }
}

/// Visible text of every paragraph element, one per line, trimmed. No
/// dedup and no length cap; the fan-out limit upstream bounds the damage.
fn extract_paragraphs(html: &str) -> String {
    let document = Html::parse_document(html);
    let paragraph_sel = Selector::parse("p").unwrap();

    document
        .select(&paragraph_sel)
        .map(|el| el.text().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

async fn fetch_one(fetcher: &dyn PageFetcher, url: &str, timeout: Duration) -> Result<String> {
    match tokio::time::timeout(timeout, fetcher.fetch_text(url)).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("fetch timed out after {timeout:?}"),
    }
}

/// Fetch all article bodies concurrently. Each item is sandboxed: a failed
/// or timed-out fetch yields an empty-string body and the batch continues.
/// The returned sequence always has the same length and order as the input.
pub async fn fetch_bodies(
    fetcher: &dyn PageFetcher,
    items: Vec<NewsItem>,
    timeout: Duration,
) -> Vec<NewsItem> {
    let futures: Vec<_> = items
        .into_iter()
        .map(|mut item| async move {
            item.body = match fetch_one(fetcher, &item.link, timeout).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(url = %item.link, error = %e, "Article fetch failed");
                    String::new()
                }
            };
            item
        })
        .collect();

    join_all(futures).await
}
