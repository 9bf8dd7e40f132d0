use std::path::PathBuf;

use thiserror::Error;

use crate::state::DEFAULT_HISTORY_CAPACITY;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MEDIA_DIR: &str = "/tmp/telegram_media";
pub const DEFAULT_WATERMARK: &str = "Mr.P 0922372220";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required in environment")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub media_dir: PathBuf,
    pub web_fetch_enabled: bool,
    pub watermark: String,
    pub ocr_lang: String,
    pub tesseract_bin: String,
    pub history_capacity: usize,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let telegram_token = required("TELEGRAM_BOT_TOKEN")?;
        let openai_api_key = required("OPENAI_API_KEY")?;

        let history_capacity = match lookup("HISTORY_CAPACITY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Invalid { key: "HISTORY_CAPACITY", value: raw }),
            },
            None => DEFAULT_HISTORY_CAPACITY,
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value: raw.clone() })?,
            None => 8080,
        };

        Ok(Config {
            telegram_token,
            openai_api_key,
            openai_model: optional("OPENAI_MODEL", DEFAULT_MODEL),
            openai_base_url: optional("OPENAI_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            media_dir: PathBuf::from(optional("MEDIA_DIR", DEFAULT_MEDIA_DIR)),
            web_fetch_enabled: lookup("WEB_SCRAPE_ENABLED").as_deref() == Some("1"),
            watermark: optional("WATERMARK_TEXT", DEFAULT_WATERMARK),
            ocr_lang: optional("OCR_LANG", "vie"),
            tesseract_bin: optional("TESSERACT_BIN", "tesseract"),
            history_capacity,
            port,
        })
    }
}
