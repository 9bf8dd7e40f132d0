use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::models::PromptEnvelope;

pub const TEMPERATURE: f32 = 0.2;
pub const CHAT_MAX_TOKENS: u32 = 700;
pub const REPORT_MAX_TOKENS: u32 = 900;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("empty response from completion service")]
    Empty,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, envelope: &PromptEnvelope, max_tokens: u32) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponseBody {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(OpenAiClient {
            client,
            api_key: config.openai_api_key.clone(),
            model: config.openai_model.clone(),
            endpoint: format!("{}/chat/completions", config.openai_base_url),
        })
    }

    fn request_body<'a>(&'a self, envelope: &'a PromptEnvelope, max_tokens: u32) -> ChatRequestBody<'a> {
        ChatRequestBody {
            model: &self.model,
            messages: envelope
                .turns()
                .iter()
                .map(|t| ChatMessage { role: t.role().as_str(), content: t.content() })
                .collect(),
            temperature: TEMPERATURE,
            max_tokens,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, envelope: &PromptEnvelope, max_tokens: u32) -> Result<String, CompletionError> {
        let body = self.request_body(envelope, max_tokens);

        let res = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(r) => r,
            Err(err) => {
                tracing::error!(error = %err, "completion request failed to send");
                return Err(err.into());
            }
        };

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            tracing::error!(%status, body = %text, "completion service non-success status");
            return Err(CompletionError::Status { status: status.as_u16(), body: text });
        }

        let body: ChatResponseBody = res.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(CompletionError::Empty);
        }

        Ok(content)
    }
}
