//! The context-to-completion pipeline.
//!
//! One [`Pipeline::run`] resolves the system message, assembles context,
//! builds the conversation, dispatches it and records the outcome in the
//! session log. The record step runs on success and failure alike; a failure
//! to write it is only warned about and never replaces the pipeline result.

use tracing::warn;

use crate::ai::{CompletionResult, Conversation, ModelDispatcher, SystemMessage};
use crate::config::{Config, GenerationOptions};
use crate::context::ContextAssembler;
use crate::error::Result;
use crate::session_log::{LogEntry, SessionLogger};
use crate::tools::ToolInvocation;

/// Everything one invocation asks for, after command-line overrides.
#[derive(Debug, Clone)]
pub struct TalkRequest {
    pub prompt: String,
    /// `provider/model`.
    pub model: String,
    pub system: SystemMessage,
    /// Context names in prompt order.
    pub contexts: Vec<String>,
    pub generation: GenerationOptions,
}

impl TalkRequest {
    /// A request using the configured defaults.
    pub fn new(prompt: impl Into<String>, config: &Config) -> Self {
        Self {
            prompt: prompt.into(),
            model: config.default_model.clone(),
            system: SystemMessage::from_flag(None, config),
            contexts: config.contexts.clone(),
            generation: config.generation.clone(),
        }
    }
}

/// Output of the preparation stage: the assembled context and the conversation.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub context: String,
    pub conversation: Conversation,
}

pub struct Pipeline {
    config: Config,
    assembler: ContextAssembler,
    dispatcher: ModelDispatcher,
    logger: SessionLogger,
}

impl Pipeline {
    pub fn new(
        config: Config,
        assembler: ContextAssembler,
        dispatcher: ModelDispatcher,
        logger: SessionLogger,
    ) -> Self {
        Self {
            config,
            assembler,
            dispatcher,
            logger,
        }
    }

    /// Resolve the system message, assemble context and build the conversation.
    pub fn prepare(&self, request: &TalkRequest) -> Result<Prepared> {
        let system = request.system.resolve(&self.config)?;
        let context = self.assembler.assemble(&request.contexts)?;
        let conversation = Conversation::build(&system, &context, &request.prompt);
        Ok(Prepared {
            context,
            conversation,
        })
    }

    pub async fn run(&self, request: &TalkRequest) -> Result<CompletionResult> {
        let mut trace = RunTrace::default();
        let outcome = self.execute(request, &mut trace).await;

        let entry = LogEntry::new(
            &request.model,
            &trace.context,
            &request.prompt,
            outcome.as_ref(),
        )
        .with_tool_calls(trace.tool_calls);
        if let Err(e) = self.logger.append(&entry) {
            warn!("{e}");
        }
        outcome
    }

    async fn execute(
        &self,
        request: &TalkRequest,
        trace: &mut RunTrace,
    ) -> Result<CompletionResult> {
        let prepared = self.prepare(request)?;
        trace.context = prepared.context;
        self.dispatcher
            .dispatch_recording(
                &prepared.conversation,
                &request.model,
                &request.generation,
                &mut trace.tool_calls,
            )
            .await
    }
}

/// What a run got through before it finished or failed.
#[derive(Default)]
struct RunTrace {
    context: String,
    tool_calls: Vec<ToolInvocation>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::ai::{CompletionBackend, CompletionReply, CompletionRequest, Role, ToolCallRequest};
    use crate::config::ProviderConfig;
    use crate::context::{ContextBlock, ContextProvider, CurrentDir};
    use crate::error::AssistantError;
    use crate::session_log::LogStatus;
    use crate::tools::{AutoApprove, CommandOutput, CommandRunner, ToolSet};

    #[derive(Clone, Default)]
    struct EchoBackend {
        requests: Arc<Mutex<Vec<CompletionRequest>>>,
    }

    #[async_trait]
    impl CompletionBackend for EchoBackend {
        async fn complete(
            &self,
            _endpoint: &ProviderConfig,
            request: &CompletionRequest,
        ) -> Result<CompletionReply> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(CompletionReply::text("try `ls -la`"))
        }
    }

    /// Asks for `run_command` on every turn.
    struct LoopingBackend;

    #[async_trait]
    impl CompletionBackend for LoopingBackend {
        async fn complete(
            &self,
            _endpoint: &ProviderConfig,
            request: &CompletionRequest,
        ) -> Result<CompletionReply> {
            Ok(CompletionReply {
                content: String::new(),
                tool_calls: vec![ToolCallRequest {
                    id: format!("call_{}", request.messages.len()),
                    name: "run_command".into(),
                    arguments: r#"{"command":"uptime"}"#.into(),
                }],
            })
        }
    }

    struct StubRunner;

    #[async_trait]
    impl CommandRunner for StubRunner {
        async fn run(&self, _command: &str) -> std::io::Result<CommandOutput> {
            Ok(CommandOutput {
                stdout: "up 3 days\n".into(),
                stderr: String::new(),
                exit_code: Some(0),
            })
        }
    }

    struct Unavailable;

    impl ContextProvider for Unavailable {
        fn name(&self) -> &str {
            "history"
        }

        fn produce(&self) -> Result<ContextBlock> {
            Err(AssistantError::context_unavailable(
                "history",
                "not inside a tmux session",
            ))
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.providers = BTreeMap::from([(
            "openai".to_string(),
            ProviderConfig::new("https://api.openai.com/v1", "sk-test"),
        )]);
        config.contexts = vec!["pwd".into()];
        config
    }

    fn pipeline(
        config: Config,
        assembler: ContextAssembler,
        backend: impl CompletionBackend + 'static,
        logger: SessionLogger,
    ) -> Pipeline {
        let dispatcher = ModelDispatcher::new(
            config.providers.clone(),
            backend,
            ToolSet::new(StubRunner, AutoApprove),
        );
        Pipeline::new(config, assembler, dispatcher, logger)
    }

    #[tokio::test]
    async fn test_run_sends_context_then_prompt_and_logs() {
        let dir = tempfile::tempdir().unwrap();
        let logger = SessionLogger::new(dir.path().join("assistant.log"));
        let backend = EchoBackend::default();
        let config = config();
        let request = TalkRequest::new("how do I list files?", &config);
        let pipeline = pipeline(
            config,
            ContextAssembler::new().with(CurrentDir::fixed("/srv/app")),
            backend.clone(),
            logger.clone(),
        );

        let result = pipeline.run(&request).await.unwrap();
        assert_eq!(result.content, "try `ls -la`");

        let requests = backend.requests.lock().unwrap();
        let messages = &requests[0].messages;
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[1].content.starts_with("[pwd]\n/srv/app"));
        assert!(messages[1].content.ends_with("how do I list files?"));

        let entries = logger.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, LogStatus::Ok);
        assert_eq!(entries[0].context, "[pwd]\n/srv/app");
        assert_eq!(entries[0].response.as_deref(), Some("try `ls -la`"));
    }

    #[tokio::test]
    async fn test_unknown_provider_aborts_and_logs_error() {
        let dir = tempfile::tempdir().unwrap();
        let logger = SessionLogger::new(dir.path().join("assistant.log"));
        let backend = EchoBackend::default();
        let config = config();
        let mut request = TalkRequest::new("hello", &config);
        request.model = "mistral/large".into();
        let pipeline = pipeline(
            config,
            ContextAssembler::new().with(CurrentDir::fixed("/srv")),
            backend.clone(),
            logger.clone(),
        );

        let err = pipeline.run(&request).await.unwrap_err();
        assert!(matches!(err, AssistantError::UnknownProvider(ref p) if p == "mistral"));
        assert!(backend.requests.lock().unwrap().is_empty());

        let entries = logger.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, LogStatus::Error);
        assert!(entries.iter().all(|e| e.status != LogStatus::Ok));
    }

    #[tokio::test]
    async fn test_context_failure_is_logged_with_empty_context() {
        let dir = tempfile::tempdir().unwrap();
        let logger = SessionLogger::new(dir.path().join("assistant.log"));
        let mut config = config();
        config.contexts = vec!["history".into()];
        let request = TalkRequest::new("what failed?", &config);
        let pipeline = pipeline(
            config,
            ContextAssembler::new().with(Unavailable),
            EchoBackend::default(),
            logger.clone(),
        );

        let err = pipeline.run(&request).await.unwrap_err();
        assert!(matches!(err, AssistantError::ContextUnavailable { .. }));

        let entries = logger.entries().unwrap();
        assert_eq!(entries[0].context, "");
        assert_eq!(entries[0].prompt, "what failed?");
        assert!(entries[0].error.as_deref().unwrap().contains("tmux"));
    }

    #[tokio::test]
    async fn test_failed_run_logs_the_tool_calls_that_ran() {
        let dir = tempfile::tempdir().unwrap();
        let logger = SessionLogger::new(dir.path().join("assistant.log"));
        let mut config = config();
        config.generation.max_tool_rounds = 5;
        let request = TalkRequest::new("is the box healthy?", &config);
        let pipeline = pipeline(
            config,
            ContextAssembler::new().with(CurrentDir::fixed("/srv")),
            LoopingBackend,
            logger.clone(),
        );

        let err = pipeline.run(&request).await.unwrap_err();
        assert!(matches!(err, AssistantError::ToolLoopExceeded { rounds: 5 }));

        let entries = logger.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, LogStatus::Error);
        assert_eq!(entries[0].context, "[pwd]\n/srv");
        assert_eq!(entries[0].tool_calls.len(), 5);
        assert!(entries[0].tool_calls.iter().all(|call| call.name == "run_command"));
        assert!(entries[0].tool_calls[0].output.contains("up 3 days"));
    }

    #[tokio::test]
    async fn test_log_failure_does_not_mask_result() {
        let dir = tempfile::tempdir().unwrap();
        let logger = SessionLogger::new(dir.path().join("no-such-dir").join("assistant.log"));
        let config = config();
        let request = TalkRequest::new("hi", &config);
        let pipeline = pipeline(
            config,
            ContextAssembler::new().with(CurrentDir::fixed("/srv")),
            EchoBackend::default(),
            logger,
        );

        let result = pipeline.run(&request).await.unwrap();
        assert_eq!(result.content, "try `ls -la`");
    }

    #[tokio::test]
    async fn test_prepare_uses_literal_system_message() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let mut request = TalkRequest::new("hi", &config);
        request.system = SystemMessage::Literal("Answer like a pirate.".into());
        request.contexts.clear();
        let pipeline = pipeline(
            config,
            ContextAssembler::new(),
            EchoBackend::default(),
            SessionLogger::new(dir.path().join("assistant.log")),
        );

        let prepared = pipeline.prepare(&request).unwrap();
        let messages = prepared.conversation.messages();
        assert_eq!(messages[0].content, "Answer like a pirate.");
        assert_eq!(messages[1].content, "hi");
        assert_eq!(prepared.context, "");
    }
}
