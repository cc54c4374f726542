use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::{MAX_ITEMS, NewsItem};
use crate::config::FeedLocale;

/// Search seam over the news feed. Implementations never fail outward: a
/// transport or parse failure is reported as an empty result set.
#[async_trait]
pub trait NewsFeed: Send + Sync {
    async fn search(&self, keyword: &str) -> Vec<NewsItem>;
}

pub struct GoogleNewsFeed {
    http_client: Arc<reqwest::Client>,
    locale: FeedLocale,
}

impl GoogleNewsFeed {
    pub fn new(http_client: Arc<reqwest::Client>, locale: FeedLocale) -> Self {
        Self {
            http_client,
            locale,
        }
    }

    fn search_url(&self, keyword: &str) -> String {
        let encoded = utf8_percent_encode(keyword, NON_ALPHANUMERIC);
        format!(
            "https://news.google.com/rss/search?q={}&hl={}&gl={}&ceid={}",
            encoded, self.locale.lang, self.locale.country, self.locale.edition
        )
    }

    async fn try_search(&self, keyword: &str) -> Result<Vec<NewsItem>> {
        let url = self.search_url(keyword);
        let bytes = self
            .http_client
            .get(&url)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .context("failed to fetch news feed")?
            .error_for_status()
            .with_context(|| format!("news feed returned error status: {url}"))?
            .bytes()
            .await
            .context("failed to read news feed body")?;

        let feed = feed_rs::parser::parse(&bytes[..]).context("failed to parse news feed")?;
        Ok(items_from_feed(feed))
    }
}

fn items_from_feed(feed: feed_rs::model::Feed) -> Vec<NewsItem> {
    feed.entries
        .into_iter()
        .take(MAX_ITEMS)
        .map(|entry| {
            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default();
            NewsItem::new(title, link)
        })
        .collect()
}

#[async_trait]
impl NewsFeed for GoogleNewsFeed {
    async fn search(&self, keyword: &str) -> Vec<NewsItem> {
        // Empty keyword is an explicit short-circuit, not an error.
        if keyword.trim().is_empty() {
            return Vec::new();
        }

        match self.try_search(keyword).await {
            Ok(items) => {
                tracing::info!(keyword = %keyword, count = items.len(), "Fetched news feed");
                items
            }
            Err(e) => {
                // No retries; a transport failure means "no results".
                tracing::warn!(keyword = %keyword, error = %e, "News feed query failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_xml(item_count: usize) -> String {
        let items: String = (1..=item_count)
            .map(|i| {
                format!(
                    "<item><title>Article {i}</title><link>https://example.com/{i}</link></item>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <rss version="2.0"><channel><title>Search results</title>{items}</channel></rss>"#
        )
    }

    #[test]
    fn test_items_from_feed_maps_title_and_link() {
        let feed = feed_rs::parser::parse(feed_xml(2).as_bytes()).unwrap();
        let items = items_from_feed(feed);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Article 1");
        assert_eq!(items[0].link, "https://example.com/1");
        assert!(items[0].body.is_empty());
    }

    #[test]
    fn test_items_from_feed_caps_at_six() {
        let feed = feed_rs::parser::parse(feed_xml(10).as_bytes()).unwrap();
        let items = items_from_feed(feed);
        assert_eq!(items.len(), MAX_ITEMS);
        assert_eq!(items[5].title, "Article 6");
    }

    #[test]
    fn test_items_from_feed_preserves_feed_order() {
        let feed = feed_rs::parser::parse(feed_xml(4).as_bytes()).unwrap();
        let items = items_from_feed(feed);
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Article 1", "Article 2", "Article 3", "Article 4"]
        );
    }

    #[test]
    fn test_search_url_encodes_keyword() {
        let feed = GoogleNewsFeed::new(Arc::new(reqwest::Client::new()), FeedLocale::default());
        let url = feed.search_url("rust async");
        assert!(url.contains("q=rust%20async"));
        assert!(url.contains("hl=en-US"));
        assert!(url.contains("gl=US"));
        assert!(url.contains("ceid=US:en") || url.contains("ceid=US%3Aen"));
    }

    #[tokio::test]
    async fn test_empty_keyword_short_circuits() {
        let feed = GoogleNewsFeed::new(Arc::new(reqwest::Client::new()), FeedLocale::default());
        assert!(feed.search("").await.is_empty());
        assert!(feed.search("   ").await.is_empty());
    }
}
