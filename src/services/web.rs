use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_SNIPPET_CHARS: usize = 3000;

static SCRIPT_OR_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style|noscript|template)\b[^>]*>.*?</(script|style|noscript|template)\s*>")
        .expect("static regex")
});
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("static regex"));
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Snippet(String),
    Disabled,
    Failed(String),
}

#[async_trait]
pub trait WebFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

pub struct HttpFetcher {
    client: Option<Client>,
}

impl HttpFetcher {
    /// With `enabled == false` every fetch short-circuits to `Disabled`.
    pub fn new(enabled: bool) -> Result<Self, reqwest::Error> {
        let client = if enabled {
            Some(
                Client::builder()
                    .timeout(FETCH_TIMEOUT)
                    .user_agent("Mozilla/5.0 (compatible)")
                    .build()?,
            )
        } else {
            None
        };
        Ok(Self { client })
    }

    async fn get_text(client: &Client, url: &str) -> Result<String, reqwest::Error> {
        client.get(url).send().await?.error_for_status()?.text().await
    }
}

#[async_trait]
impl WebFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let Some(client) = self.client.as_ref() else {
            return FetchOutcome::Disabled;
        };

        match Self::get_text(client, url).await {
            Ok(body) => {
                let text = html_to_text(&body);
                if text.is_empty() {
                    FetchOutcome::Failed("page has no visible text".to_string())
                } else {
                    FetchOutcome::Snippet(truncate_chars(&text, MAX_SNIPPET_CHARS).to_string())
                }
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "web fetch failed");
                FetchOutcome::Failed(err.to_string())
            }
        }
    }
}

/// Visible text of an HTML page, space separated.
pub fn html_to_text(html: &str) -> String {
    let without_code = SCRIPT_OR_STYLE.replace_all(html, " ");
    let without_comments = COMMENT.replace_all(&without_code, " ");
    let without_tags = TAG.replace_all(&without_comments, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE.replace_all(&decoded, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
