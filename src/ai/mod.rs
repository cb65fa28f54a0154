//! AI module for building conversations and dispatching them to a model.
//!
//! This module provides the conversation model, `provider/model` parsing, the
//! completion backend abstraction and the dispatcher that resolves tool calls.

pub mod client;
pub mod conversation;
pub mod dispatcher;
pub mod model;
pub mod prompt;

pub use client::{CompletionBackend, CompletionReply, CompletionRequest, OpenAiBackend};
pub use conversation::{Conversation, Message, Role, SystemMessage, ToolCallRequest};
pub use dispatcher::{CompletionResult, ModelDispatcher};
pub use model::ModelSpec;
