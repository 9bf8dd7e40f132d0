pub mod conversation;
pub mod telegram;

pub use conversation::{ConversationTurn, PromptEnvelope, Role};
pub use telegram::{Inbound, InboundKind, ReplyTarget, TelegramResponse, Update};
