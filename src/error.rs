//! Error types for the assistant pipeline.
//!
//! Every failure the pipeline can surface is a variant of [`AssistantError`].
//! Only [`AssistantError::LogWrite`] is recoverable: callers warn about it and
//! keep the primary result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssistantError {
    /// A context source could not be read (e.g. not running inside tmux).
    #[error("context '{context}' unavailable: {reason}")]
    ContextUnavailable { context: String, reason: String },

    #[error("unknown context '{0}' in configuration")]
    UnknownContext(String),

    #[error("system message '{0}' not found in configuration")]
    UnknownSystemMessage(String),

    #[error("malformed model '{0}': expected 'provider/model'")]
    MalformedModelSpec(String),

    #[error("provider '{0}' is not configured")]
    UnknownProvider(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("tool call loop exceeded {rounds} rounds")]
    ToolLoopExceeded { rounds: usize },

    #[error("failed to write session log {path}: {reason}")]
    LogWrite { path: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl AssistantError {
    pub fn context_unavailable(context: &str, reason: impl Into<String>) -> Self {
        Self::ContextUnavailable {
            context: context.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
