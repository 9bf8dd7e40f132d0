use serde::{Deserialize, Serialize};

use crate::i18n::Locale;

#[derive(Deserialize)]
pub struct TelegramResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub document: Option<TelegramDocument>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub language_code: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramDocument {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramFile {
    #[serde(default)]
    pub file_path: Option<String>,
}

#[derive(Serialize)]
pub struct GetUpdatesRequest<'a> {
    pub offset: i64,
    pub timeout: u64,
    pub allowed_updates: &'a [&'a str],
}

#[derive(Serialize)]
pub struct GetFileRequest<'a> {
    pub file_id: &'a str,
}

#[derive(Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
}

/// Where a reply for an inbound event goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyTarget {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundKind {
    Photo { file_id: String },
    Document { file_id: String, file_name: String },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Inbound {
    pub user_id: i64,
    pub locale: Locale,
    pub target: ReplyTarget,
    pub kind: InboundKind,
}

impl Inbound {
    /// Maps a Telegram message onto one of the three handled shapes.
    /// Photo wins over document, then text; anything else is dropped.
    pub fn from_message(message: &TelegramMessage) -> Option<Self> {
        let from = message.from.as_ref()?;
        let kind = if let Some(sizes) = message.photo.as_ref().filter(|s| !s.is_empty()) {
            // Telegram orders sizes ascending; the last one is the original resolution.
            let largest = sizes.last()?;
            InboundKind::Photo { file_id: largest.file_id.clone() }
        } else if let Some(doc) = message.document.as_ref() {
            InboundKind::Document {
                file_id: doc.file_id.clone(),
                file_name: doc
                    .file_name
                    .clone()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| "document".to_string()),
            }
        } else if let Some(text) = message.text.as_ref() {
            InboundKind::Text(text.clone())
        } else {
            return None;
        };

        Some(Inbound {
            user_id: from.id,
            locale: Locale::from_language_code(from.language_code.as_deref()),
            target: ReplyTarget { chat_id: message.chat.id, message_id: message.message_id },
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<Update> {
        let resp: TelegramResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        assert!(resp.ok);
        resp.result.unwrap()
    }

    #[test]
    fn photo_message_picks_largest_size() {
        let updates = parse(
            r#"{"ok":true,"result":[{"update_id":7,"message":{
                "message_id":11,"chat":{"id":-5},"from":{"id":42,"language_code":"vi"},
                "photo":[{"file_id":"small","width":90,"height":90},{"file_id":"big","width":1280,"height":960}]
            }}]}"#,
        );
        let inbound = Inbound::from_message(updates[0].message.as_ref().unwrap()).unwrap();

        assert_eq!(inbound.user_id, 42);
        assert_eq!(inbound.locale, Locale::Vi);
        assert_eq!(inbound.target, ReplyTarget { chat_id: -5, message_id: 11 });
        assert_eq!(inbound.kind, InboundKind::Photo { file_id: "big".into() });
    }

    #[test]
    fn document_without_name_gets_default() {
        let updates = parse(
            r#"{"ok":true,"result":[{"update_id":8,"message":{
                "message_id":12,"chat":{"id":1},"from":{"id":1,"language_code":"en-US"},
                "document":{"file_id":"doc1"}
            }}]}"#,
        );
        let inbound = Inbound::from_message(updates[0].message.as_ref().unwrap()).unwrap();

        assert_eq!(inbound.locale, Locale::En);
        assert_eq!(
            inbound.kind,
            InboundKind::Document { file_id: "doc1".into(), file_name: "document".into() }
        );
    }

    #[test]
    fn sticker_only_message_is_ignored() {
        let updates = parse(
            r#"{"ok":true,"result":[{"update_id":9,"message":{
                "message_id":13,"chat":{"id":1},"from":{"id":1},"sticker":{"file_id":"s"}
            }}]}"#,
        );
        assert!(Inbound::from_message(updates[0].message.as_ref().unwrap()).is_none());
    }

    #[test]
    fn error_response_carries_description() {
        let resp: TelegramResponse<Vec<Update>> =
            serde_json::from_str(r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#).unwrap();
        assert!(!resp.ok);
        assert!(resp.result.is_none());
        assert_eq!(resp.description.as_deref(), Some("Unauthorized"));
    }
}
