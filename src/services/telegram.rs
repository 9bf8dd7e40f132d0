use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::telegram::{
    GetFileRequest, GetUpdatesRequest, SendMessageRequest, TelegramFile,
};
use crate::models::{ReplyTarget, TelegramResponse, Update};

pub const LONG_POLL_TIMEOUT_SECS: u64 = 60;
const MAX_MESSAGE_CHARS: usize = 4096;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telegram request failed: {0}")]
    Http(reqwest::Error),

    #[error("failed to parse Telegram response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Telegram API error: {0}")]
    Api(String),

    #[error("file {0} has no download path")]
    NoFilePath(String),
}

// Request URLs carry the bot token, so they never reach error text.
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.without_url())
    }
}

/// The parts of the Bot API the dispatcher talks to.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolves a file id to the server-side path used for downloading.
    async fn get_file(&self, file_id: &str) -> Result<String, TransportError>;

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, TransportError>;

    async fn reply(&self, target: ReplyTarget, text: &str) -> Result<(), TransportError>;
}

pub struct TelegramBot {
    client: Client,
    api_url: String,
    file_url: String,
}

impl TelegramBot {
    pub fn new(bot_token: &str) -> Result<Self, TransportError> {
        // Must outlive the long-poll window or every idle getUpdates would time out.
        let client = Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_TIMEOUT_SECS + 15))
            .build()?;

        Ok(TelegramBot {
            client,
            api_url: format!("https://api.telegram.org/bot{}", bot_token),
            file_url: format!("https://api.telegram.org/file/bot{}", bot_token),
        })
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TransportError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api_url, method);
        let response_text = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await?
            .text()
            .await?;

        let response: TelegramResponse<T> = serde_json::from_str(&response_text)?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(TransportError::Api(format!("{} returned no result", method))),
            (false, _) => Err(TransportError::Api(
                response.description.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }

    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: LONG_POLL_TIMEOUT_SECS,
            allowed_updates: &["message"],
        };
        self.call("getUpdates", &request).await
    }
}

#[async_trait]
impl Transport for TelegramBot {
    async fn get_file(&self, file_id: &str) -> Result<String, TransportError> {
        let file: TelegramFile = self.call("getFile", &GetFileRequest { file_id }).await?;
        file.file_path
            .ok_or_else(|| TransportError::NoFilePath(file_id.to_string()))
    }

    async fn download_file(&self, file_path: &str) -> Result<Vec<u8>, TransportError> {
        let url = format!("{}/{}", self.file_url, file_path);
        let bytes = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    async fn reply(&self, target: ReplyTarget, text: &str) -> Result<(), TransportError> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            let request = SendMessageRequest {
                chat_id: target.chat_id,
                text: chunk,
                reply_to_message_id: Some(target.message_id),
            };
            let _: serde_json::Value = self.call("sendMessage", &request).await?;
        }
        Ok(())
    }
}

/// Splits on char boundaries so no chunk exceeds Telegram's message limit.
pub fn split_message(text: &str, max_chars: usize) -> Vec<&str> {
    if text.is_empty() {
        return vec![text];
    }
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (idx, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    chunks.push(&text[start..]);
    chunks
}
