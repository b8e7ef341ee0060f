//! Core types for oracle requests and responses.

use serde::{Deserialize, Serialize};

/// Who the oracle is asked to be for a call. Each role carries a fixed
/// one-line system message; the detailed persona lives in the prompt body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OracleRole {
    /// Turn narrative, opening and skip montages.
    Narrator,
    /// Probe questions and personality analysis.
    Psychologist,
    /// Macro events.
    Historian,
    /// Destiny outcome judgment.
    Judge,
    /// NPC situation updates.
    NpcEngine,
    /// Long-term memory consolidation.
    Biographer,
    /// Choice menus.
    GameDesigner,
}

impl OracleRole {
    /// System message sent ahead of the prompt.
    #[must_use]
    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Narrator => "You are a narrator.",
            Self::Psychologist => "You are a psychologist.",
            Self::Historian => "You are a historian.",
            Self::Judge => "You are a judge.",
            Self::NpcEngine => "You are a NPC engine.",
            Self::Biographer => "You are a biographer.",
            Self::GameDesigner => "You are a game designer.",
        }
    }

    /// Short name for logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Narrator => "narrator",
            Self::Psychologist => "psychologist",
            Self::Historian => "historian",
            Self::Judge => "judge",
            Self::NpcEngine => "npc_engine",
            Self::Biographer => "biographer",
            Self::GameDesigner => "game_designer",
        }
    }
}

impl std::fmt::Display for OracleRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a call expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Any text.
    Text,
    /// A JSON array or object.
    Json,
}

/// Chat message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions.
    System,
    /// User turn.
    User,
    /// Model turn.
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: MessageRole,
    /// Text.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// User message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Chat-completions request body: `{model, stream, messages}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    /// Model name.
    pub model: String,
    /// Always `false`; responses are read whole.
    pub stream: bool,
    /// Conversation.
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Content of the last user message, if any.
    #[must_use]
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

/// Chat-completions response body, reduced to what is read.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Completions; only the first is used.
    pub choices: Vec<ChatChoice>,
}

/// One completion.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    /// Generated message.
    pub message: ChatContent,
}

/// Generated message payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatContent {
    /// Text; absent for some tool-call responses.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first completion.
    #[must_use]
    pub fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}
