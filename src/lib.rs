//! term-assistant - ask a language model about what is on your terminal.
//!
//! This library provides the pipeline behind the `term-assistant` binary:
//! - Context gathering from the tmux session (pane history, working directory, shell)
//! - Conversation building with configurable system messages
//! - Dispatch to any OpenAI-compatible provider, with bounded tool calling
//! - An append-only session log of every interaction
//!
//! # Example
//!
//! ```no_run
//! use term_assistant::ai::{ModelDispatcher, OpenAiBackend};
//! use term_assistant::config::Config;
//! use term_assistant::context::ContextAssembler;
//! use term_assistant::mux::Tmux;
//! use term_assistant::pipeline::{Pipeline, TalkRequest};
//! use term_assistant::session_log::SessionLogger;
//! use term_assistant::tools::{AutoApprove, ShellRunner, ToolSet};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let assembler = ContextAssembler::with_builtin(Tmux::from_env(), &config.history_context_options);
//!     let tools = ToolSet::new(ShellRunner::new(), AutoApprove);
//!     let dispatcher = ModelDispatcher::new(config.providers.clone(), OpenAiBackend::new(), tools);
//!
//!     let request = TalkRequest::new("why did my last command fail?", &config);
//!     let pipeline = Pipeline::new(config, assembler, dispatcher, SessionLogger::from_env());
//!     let result = pipeline.run(&request).await?;
//!     println!("{}", result.content);
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod config;
pub mod context;
pub mod error;
pub mod mux;
pub mod pipeline;
pub mod session_log;
pub mod tools;
pub mod utils;

// Re-export commonly used types
pub use ai::{CompletionResult, Conversation, ModelDispatcher, ModelSpec, SystemMessage};
pub use config::Config;
pub use context::{ContextAssembler, ContextBlock, ContextProvider};
pub use error::{AssistantError, Result};
pub use pipeline::{Pipeline, TalkRequest};
pub use session_log::SessionLogger;
