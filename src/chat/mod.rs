pub mod history;
pub mod intent;

use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::llm::{ChatMessage, ChatModel};
use crate::pipeline::publish::Publisher;
use crate::pipeline::{Card, Pipeline, PipelineOutcome};

use self::history::{ChatHistory, ChatTurn, Role};
use self::intent::{extract_keyword, is_news_request};

const CHAT_FAILURE_REPLY: &str = "Something went wrong while handling that request.";

/// Interactive chat loop: news requests go through the pipeline, anything
/// else goes to the chat model with the accumulated transcript as context.
pub struct ChatSession {
    history: ChatHistory,
    model: Arc<dyn ChatModel>,
    pipeline: Arc<dyn Pipeline>,
    publisher: Arc<dyn Publisher>,
}

impl ChatSession {
    pub fn new(
        history: ChatHistory,
        model: Arc<dyn ChatModel>,
        pipeline: Arc<dyn Pipeline>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            history,
            model,
            pipeline,
            publisher,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("newsdesk chat -- ask for news (\"latest AI news\") or just talk. Ctrl-D to exit.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            print_prompt();
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let input = line.trim();
            if input.is_empty() {
                continue;
            }

            let reply = self.handle_message(input).await?;
            println!("{reply}\n");
        }

        Ok(())
    }

    /// Process one user message and return the rendered assistant reply.
    /// Both turns are appended to the persisted transcript.
    pub async fn handle_message(&mut self, input: &str) -> Result<String> {
        self.history.push(ChatTurn::new(Role::User, input))?;

        let reply = if is_news_request(input) {
            self.news_reply(input).await
        } else {
            self.chat_reply().await
        };

        self.history
            .push(ChatTurn::new(Role::Assistant, reply.clone()))?;
        Ok(reply)
    }

    async fn news_reply(&self, input: &str) -> String {
        let keyword = extract_keyword(input);
        let shown = if keyword.is_empty() { input } else { &keyword };
        tracing::info!(keyword = %shown, "News request detected");

        match self.pipeline.run(input, shown).await {
            Ok(PipelineOutcome::Published { cards, url }) => {
                let mut reply = String::from("I found and summarized the latest articles.");
                if let Some(url) = url {
                    reply.push_str(&format!(" Notion page: {url}"));
                }
                reply.push_str("\n\n");
                reply.push_str(&render_cards(&cards));
                reply
            }
            Ok(PipelineOutcome::PublishFailed { cards }) => {
                let mut reply = String::from(
                    "I found and summarized the latest articles, but saving to Notion failed.",
                );
                if let Some(diag) = self.publisher.diagnostics().last() {
                    reply.push_str(&format!("\n  {diag}"));
                }
                reply.push_str("\n\n");
                reply.push_str(&render_cards(&cards));
                reply
            }
            Ok(PipelineOutcome::NoResults) => {
                "I couldn't find any recent articles for that keyword.".to_string()
            }
            Err(e) => {
                tracing::error!(error = %e, "Interactive pipeline run failed");
                CHAT_FAILURE_REPLY.to_string()
            }
        }
    }

    async fn chat_reply(&self) -> String {
        let messages: Vec<ChatMessage> = self
            .history
            .turns()
            .iter()
            .map(|turn| match turn.role {
                Role::User => ChatMessage::user(turn.content.clone()),
                Role::Assistant => ChatMessage::assistant(turn.content.clone()),
            })
            .collect();

        match self.model.complete(&messages).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "Chat completion failed");
                CHAT_FAILURE_REPLY.to_string()
            }
        }
    }
}

fn print_prompt() {
    use std::io::Write;
    print!("> ");
    let _ = std::io::stdout().flush();
}

fn render_cards(cards: &[Card]) -> String {
    cards
        .iter()
        .enumerate()
        .map(|(i, card)| {
            format!(
                "{}. {}\n   {}\n   {}",
                i + 1,
                card.title,
                card.summary,
                card.link
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
