pub mod feed;
pub mod fetch;
pub mod publish;
pub mod summarize;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use self::feed::NewsFeed;
use self::fetch::{FETCH_TIMEOUT, PageFetcher, fetch_bodies};
use self::publish::Publisher;
use self::summarize::Summarizer;

/// Fan-out cap: a pipeline run never carries more than this many articles.
pub const MAX_ITEMS: usize = 6;

/// A candidate article as it moves through the pipeline. Created by the
/// feed client with an empty body; the fetch stage fills the body in
/// (empty string when the fetch failed, never absent).
#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub body: String,
}

impl NewsItem {
    pub fn new(title: String, link: String) -> Self {
        Self {
            title,
            link,
            body: String::new(),
        }
    }
}

/// The summarized, immutable form handed to the publisher.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub title: String,
    pub summary: String,
    pub link: String,
}

/// Terminal state of one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Published {
        cards: Vec<Card>,
        url: Option<String>,
    },
    PublishFailed {
        cards: Vec<Card>,
    },
    NoResults,
}

/// One keyword invocation of search -> fetch -> summarize -> publish.
#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn run(&self, request_label: &str, keyword: &str) -> Result<PipelineOutcome>;
}

pub struct NewsPipeline {
    feed: Arc<dyn NewsFeed>,
    fetcher: Arc<dyn PageFetcher>,
    summarizer: Summarizer,
    publisher: Arc<dyn Publisher>,
}

impl NewsPipeline {
    pub fn new(
        feed: Arc<dyn NewsFeed>,
        fetcher: Arc<dyn PageFetcher>,
        summarizer: Summarizer,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            feed,
            fetcher,
            summarizer,
            publisher,
        }
    }
}

#[async_trait]
impl Pipeline for NewsPipeline {
    async fn run(&self, request_label: &str, keyword: &str) -> Result<PipelineOutcome> {
        let items = self.feed.search(keyword).await;
        if items.is_empty() {
            tracing::info!(keyword = %keyword, "No articles found");
            return Ok(PipelineOutcome::NoResults);
        }

        let items = fetch_bodies(self.fetcher.as_ref(), items, FETCH_TIMEOUT).await;
        let summaries = self.summarizer.summarize(&items).await;

        let cards: Vec<Card> = items
            .into_iter()
            .zip(summaries)
            .take(MAX_ITEMS)
            .map(|(item, summary)| Card {
                title: item.title,
                summary,
                link: item.link,
            })
            .collect();

        let result = self.publisher.publish(request_label, keyword, &cards).await;
        if result.success {
            Ok(PipelineOutcome::Published {
                cards,
                url: result.url,
            })
        } else {
            Ok(PipelineOutcome::PublishFailed { cards })
        }
    }
}
