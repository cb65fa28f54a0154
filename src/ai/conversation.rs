//! Conversation model and system-message resolution.
//!
//! A freshly built [`Conversation`] always holds exactly two messages: the
//! system message first and the user message (context + prompt) last. The
//! dispatcher appends assistant and tool turns to its own copy while tool calls
//! are resolved.

use serde::{Deserialize, Serialize};

use super::prompt;
use crate::config::Config;
use crate::error::{AssistantError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool invocation requested by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments, exactly as sent by the model.
    pub arguments: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// System message, then one user message with the context ahead of the prompt.
    pub fn build(system_message: &str, assembled_context: &str, user_prompt: &str) -> Self {
        Self {
            messages: vec![
                Message::system(system_message),
                Message::user(prompt::compose_user_message(assembled_context, user_prompt)),
            ],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// The `-s` flag value, classified at the command-line boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SystemMessage {
    /// Use the text as-is.
    Literal(String),
    /// Look the text up in `system_messages`.
    Named(String),
}

impl SystemMessage {
    /// A value naming a configured message is `Named`; any other value is
    /// literal text. No value selects the configured default by name.
    pub fn from_flag(flag: Option<&str>, config: &Config) -> Self {
        match flag {
            Some(value) if config.system_messages.contains_key(value) => {
                Self::Named(value.to_string())
            }
            Some(value) => Self::Literal(value.to_string()),
            None => Self::Named(config.default_system_message.clone()),
        }
    }

    pub fn resolve(&self, config: &Config) -> Result<String> {
        match self {
            Self::Literal(text) => Ok(text.clone()),
            Self::Named(name) => config
                .system_messages
                .get(name)
                .cloned()
                .ok_or_else(|| AssistantError::UnknownSystemMessage(name.clone())),
        }
    }
}
