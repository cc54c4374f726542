use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Text-generation seam. The summarizer and the chat responder both go
/// through this trait so tests can inject failures per call.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

pub struct OpenAiChat {
    http_client: Arc<reqwest::Client>,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(http_client: Arc<reqwest::Client>, api_key: String, model: String) -> Self {
        Self {
            http_client,
            api_key,
            model,
        }
    }
}

fn request_body(model: &str, messages: &[ChatMessage]) -> Value {
    json!({
        "model": model,
        "messages": messages,
    })
}

fn extract_content(response: &Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .context("chat completion response missing message content")
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self
            .http_client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body(&self.model, messages))
            .send()
            .await
            .context("failed to call chat completion API")?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .context("failed to parse chat completion response")?;

        if !status.is_success() {
            let msg = body["error"]["message"].as_str().unwrap_or("unknown error");
            anyhow::bail!("chat completion API returned {status}: {msg}");
        }

        extract_content(&body)
    }
}
