use std::sync::Arc;

use crate::llm::{ChatMessage, ChatModel};

use super::NewsItem;

/// Fixed substitute used when a per-item summarization call fails.
pub const SUMMARY_UNAVAILABLE: &str = "summary unavailable";

pub struct Summarizer {
    model: Arc<dyn ChatModel>,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// One summary per input item, in input order. Each item is an
    /// independent model call; a failed call substitutes the fixed
    /// placeholder instead of dropping the item, so the output length
    /// always equals the input length.
    pub async fn summarize(&self, items: &[NewsItem]) -> Vec<String> {
        let mut summaries = Vec::with_capacity(items.len());

        for item in items {
            let prompt = summary_prompt(&item.title, &item.body);
            let summary = match self.model.complete(&[ChatMessage::user(prompt)]).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(title = %item.title, error = %e, "Summarization failed");
                    SUMMARY_UNAVAILABLE.to_string()
                }
            };
            summaries.push(summary);
        }

        summaries
    }
}

fn summary_prompt(title: &str, body: &str) -> String {
    format!(
        "Summarize the following news article in two or three short, neutral sentences.\n\
         Title: {title}\n\
         Body: {body}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Model that fails whenever the prompt contains a marker string, and
    /// counts calls.
    struct ScriptedModel {
        fail_marker: &'static str,
        calls: AtomicUsize,
    }

    impl ScriptedModel {
        fn failing_on(marker: &'static str) -> Self {
            Self {
                fail_marker: marker,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let prompt = &messages[0].content;
            if !self.fail_marker.is_empty() && prompt.contains(self.fail_marker) {
                anyhow::bail!("model overloaded");
            }
            Ok(format!("summary #{}", self.calls.load(Ordering::SeqCst)))
        }
    }

    fn item(title: &str, body: &str) -> NewsItem {
        let mut item = NewsItem::new(title.to_string(), "https://example.com".to_string());
        item.body = body.to_string();
        item
    }

    #[tokio::test]
    async fn test_one_summary_per_item_in_order() {
        let model = Arc::new(ScriptedModel::failing_on(""));
        let summarizer = Summarizer::new(model.clone());
        let items = vec![item("a", "body a"), item("b", "body b"), item("c", "body c")];

        let summaries = summarizer.summarize(&items).await;
        assert_eq!(summaries, vec!["summary #1", "summary #2", "summary #3"]);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_failed_item_gets_placeholder_without_blocking_others() {
        let model = Arc::new(ScriptedModel::failing_on("broken"));
        let summarizer = Summarizer::new(model);
        let items = vec![item("ok one", "text"), item("broken item", "text"), item("ok two", "text")];

        let summaries = summarizer.summarize(&items).await;
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[1], SUMMARY_UNAVAILABLE);
        assert_ne!(summaries[0], SUMMARY_UNAVAILABLE);
        assert_ne!(summaries[2], SUMMARY_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_empty_body_still_summarized() {
        let model = Arc::new(ScriptedModel::failing_on(""));
        let summarizer = Summarizer::new(model);
        let items = vec![item("title only", "")];

        let summaries = summarizer.summarize(&items).await;
        assert_eq!(summaries.len(), 1);
        assert!(!summaries[0].is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let model = Arc::new(ScriptedModel::failing_on(""));
        let summarizer = Summarizer::new(model.clone());
        let summaries = summarizer.summarize(&[]).await;
        assert!(summaries.is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_prompt_contains_title_and_body() {
        let prompt = summary_prompt("Rates held steady", "The central bank kept rates flat.");
        assert!(prompt.contains("Title: Rates held steady"));
        assert!(prompt.contains("Body: The central bank kept rates flat."));
        assert!(prompt.contains("neutral"));
    }
}
