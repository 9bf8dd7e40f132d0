use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message attributed to a role. Fields are private so a turn cannot be
/// edited once it sits in a history.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    role: Role,
    content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into() }
    }

    #[cfg(test)]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[cfg(test)]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// System instruction followed by the user's history, built fresh per call.
#[derive(Debug, Clone)]
pub struct PromptEnvelope {
    turns: Vec<ConversationTurn>,
}

impl PromptEnvelope {
    pub fn assemble(system_prompt: &str, history: Vec<ConversationTurn>) -> Self {
        let mut turns = Vec::with_capacity(history.len() + 1);
        turns.push(ConversationTurn::system(system_prompt));
        turns.extend(history);
        Self { turns }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }
}

// Tags prefixed to history turns so the model can tell where content came from.
pub const OCR_TAG: &str = "[OCR] ";
pub const IMAGE_MARKER: &str = "[Ảnh đính kèm]";
pub const WEB_TAG: &str = "[WEB] ";
pub const PDF_TAG: &str = "[PDF] ";
pub const PDF_TEXT_TAG: &str = "[PDF-TEXT] ";
pub const EXTRACT_REQUEST_TAG: &str = "[Yêu cầu trích xuất PDF] ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_puts_system_prompt_first() {
        let history = vec![ConversationTurn::user("xe bị tông"), ConversationTurn::assistant("ok")];
        let envelope = PromptEnvelope::assemble("sys", history);

        let roles: Vec<Role> = envelope.turns().iter().map(|t| t.role()).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(envelope.turns()[0].content(), "sys");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
