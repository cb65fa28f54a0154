//! Model dispatch with bounded tool-call resolution.
//!
//! The dispatcher resolves `provider/model` against the configured providers,
//! sends the conversation and, while the provider keeps asking for tools,
//! executes them and sends the results back. At most `max_tool_rounds` rounds
//! run; a further tool request fails with
//! [`AssistantError::ToolLoopExceeded`].

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use super::client::{CompletionBackend, CompletionRequest};
use super::conversation::{Conversation, Message};
use super::model::ModelSpec;
use crate::config::{GenerationOptions, ProviderConfig};
use crate::error::{AssistantError, Result};
use crate::tools::{ToolInvocation, ToolSet};

/// The final answer and every tool call made to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub model: String,
    pub content: String,
    pub tool_calls: Vec<ToolInvocation>,
}

pub struct ModelDispatcher {
    providers: BTreeMap<String, ProviderConfig>,
    backend: Box<dyn CompletionBackend>,
    tools: ToolSet,
}

impl ModelDispatcher {
    pub fn new(
        providers: BTreeMap<String, ProviderConfig>,
        backend: impl CompletionBackend + 'static,
        tools: ToolSet,
    ) -> Self {
        Self {
            providers,
            backend: Box::new(backend),
            tools,
        }
    }

    /// Resolve `model` to a provider endpoint.
    pub fn resolve(&self, model: &str) -> Result<(ModelSpec, &ProviderConfig)> {
        let spec = ModelSpec::parse(model)?;
        let endpoint = self
            .providers
            .get(&spec.provider)
            .ok_or_else(|| AssistantError::UnknownProvider(spec.provider.clone()))?;
        Ok((spec, endpoint))
    }

    pub async fn dispatch(
        &self,
        conversation: &Conversation,
        model: &str,
        options: &GenerationOptions,
    ) -> Result<CompletionResult> {
        let mut executed = Vec::new();
        self.dispatch_recording(conversation, model, options, &mut executed).await
    }

    /// Same as [`dispatch`](Self::dispatch), but every executed tool call is
    /// also pushed onto `executed` as it finishes. The calls stay there when
    /// the loop fails part way, so the caller can still record them.
    pub async fn dispatch_recording(
        &self,
        conversation: &Conversation,
        model: &str,
        options: &GenerationOptions,
        executed: &mut Vec<ToolInvocation>,
    ) -> Result<CompletionResult> {
        let first_call = executed.len();
        let (spec, endpoint) = self.resolve(model)?;
        info!(provider = %spec.provider, model = %spec.model, "Dispatching to model");

        let tools = if options.with_tools {
            self.tools.definitions()
        } else {
            Vec::new()
        };

        let mut turns = conversation.clone();
        let mut rounds = 0usize;

        loop {
            let request = CompletionRequest {
                model: spec.model.clone(),
                messages: turns.messages().to_vec(),
                temperature: options.temperature,
                top_p: options.top_p,
                tools: tools.clone(),
            };
            let reply = self.backend.complete(endpoint, &request).await?;

            if reply.tool_calls.is_empty() {
                debug!(rounds, chars = reply.content.len(), "Received final response");
                return Ok(CompletionResult {
                    model: spec.to_string(),
                    content: reply.content,
                    tool_calls: executed[first_call..].to_vec(),
                });
            }

            if !options.with_tools {
                warn!(
                    calls = reply.tool_calls.len(),
                    "Model requested tools while tools are disabled, ignoring"
                );
                return Ok(CompletionResult {
                    model: spec.to_string(),
                    content: reply.content,
                    tool_calls: executed[first_call..].to_vec(),
                });
            }

            if rounds >= options.max_tool_rounds {
                warn!(rounds, "Tool call limit reached");
                return Err(AssistantError::ToolLoopExceeded { rounds });
            }
            rounds += 1;
            debug!(round = rounds, calls = reply.tool_calls.len(), "Executing tool calls");

            turns.push(Message::assistant(reply.content, reply.tool_calls.clone()));
            for call in &reply.tool_calls {
                let invocation = self.tools.execute(call).await;
                turns.push(Message::tool(&call.id, invocation.output.clone()));
                executed.push(invocation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::ai::client::CompletionReply;
    use crate::ai::conversation::{Role, ToolCallRequest};
    use crate::tools::{AutoApprove, CommandOutput, CommandRunner};

    /// Replays scripted replies, then answers "done".
    #[derive(Clone, Default)]
    struct ScriptedBackend {
        replies: Arc<Mutex<Vec<Result<CompletionReply>>>>,
        requests: Arc<Mutex<Vec<(ProviderConfig, CompletionRequest)>>>,
        repeat_tool_call: bool,
    }

    impl ScriptedBackend {
        fn replying(replies: Vec<Result<CompletionReply>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies)),
                ..Self::default()
            }
        }

        fn always_tool_call() -> Self {
            Self {
                repeat_tool_call: true,
                ..Self::default()
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            endpoint: &ProviderConfig,
            request: &CompletionRequest,
        ) -> Result<CompletionReply> {
            let mut requests = self.requests.lock().unwrap();
            requests.push((endpoint.clone(), request.clone()));
            if self.repeat_tool_call {
                return Ok(tool_reply(&format!("call_{}", requests.len()), "ls"));
            }
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Ok(CompletionReply::text("done"));
            }
            replies.remove(0)
        }
    }

    #[derive(Clone, Default)]
    struct CountingRunner {
        runs: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl CommandRunner for CountingRunner {
        async fn run(&self, command: &str) -> std::io::Result<CommandOutput> {
            *self.runs.lock().unwrap() += 1;
            Ok(CommandOutput {
                stdout: format!("ran {command}\n"),
                stderr: String::new(),
                exit_code: Some(0),
            })
        }
    }

    fn tool_reply(id: &str, command: &str) -> CompletionReply {
        CompletionReply {
            content: String::new(),
            tool_calls: vec![ToolCallRequest {
                id: id.to_string(),
                name: "run_command".to_string(),
                arguments: serde_json::json!({ "command": command }).to_string(),
            }],
        }
    }

    fn providers() -> BTreeMap<String, ProviderConfig> {
        BTreeMap::from([(
            "openai".to_string(),
            ProviderConfig::new("https://api.openai.com/v1", "sk-test"),
        )])
    }

    fn dispatcher(backend: ScriptedBackend, runner: CountingRunner) -> ModelDispatcher {
        ModelDispatcher::new(providers(), backend, ToolSet::new(runner, AutoApprove))
    }

    fn conversation() -> Conversation {
        Conversation::build("system", "[pwd]\n/srv", "what is here?")
    }

    #[tokio::test]
    async fn test_plain_completion() {
        let backend = ScriptedBackend::replying(vec![Ok(CompletionReply::text("hello"))]);
        let dispatcher = dispatcher(backend.clone(), CountingRunner::default());
        let options = GenerationOptions {
            temperature: 0.2,
            top_p: 0.9,
            ..GenerationOptions::default()
        };

        let result = dispatcher
            .dispatch(&conversation(), "openai/gpt-4o", &options)
            .await
            .unwrap();

        assert_eq!(result.content, "hello");
        assert_eq!(result.model, "openai/gpt-4o");
        assert!(result.tool_calls.is_empty());

        let requests = backend.requests.lock().unwrap();
        let (endpoint, request) = &requests[0];
        assert_eq!(endpoint.api_key, "sk-test");
        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.temperature, 0.2);
        assert_eq!(request.top_p, 0.9);
        assert_eq!(request.tools.len(), 2);
        assert_eq!(request.messages, conversation().messages());
    }

    #[tokio::test]
    async fn test_tools_omitted_when_disabled() {
        let backend = ScriptedBackend::replying(vec![Ok(CompletionReply::text("hi"))]);
        let dispatcher = dispatcher(backend.clone(), CountingRunner::default());
        let options = GenerationOptions {
            with_tools: false,
            ..GenerationOptions::default()
        };

        dispatcher
            .dispatch(&conversation(), "openai/gpt-4o", &options)
            .await
            .unwrap();

        assert!(backend.requests.lock().unwrap()[0].1.tools.is_empty());
    }

    #[tokio::test]
    async fn test_tool_call_round_trip() {
        let backend = ScriptedBackend::replying(vec![
            Ok(tool_reply("call_1", "ls /")),
            Ok(CompletionReply::text("There are 3 files.")),
        ]);
        let runner = CountingRunner::default();
        let dispatcher = dispatcher(backend.clone(), runner.clone());

        let result = dispatcher
            .dispatch(&conversation(), "openai/gpt-4o", &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(result.content, "There are 3 files.");
        assert_eq!(result.tool_calls.len(), 1);
        assert!(result.tool_calls[0].output.contains("ran ls /"));
        assert_eq!(*runner.runs.lock().unwrap(), 1);

        // The follow-up request carries the assistant call and the tool result.
        let requests = backend.requests.lock().unwrap();
        let follow_up = &requests[1].1.messages;
        assert_eq!(follow_up.len(), 4);
        assert_eq!(follow_up[2].role, Role::Assistant);
        assert_eq!(follow_up[2].tool_calls[0].id, "call_1");
        assert_eq!(follow_up[3].role, Role::Tool);
        assert_eq!(follow_up[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn test_tool_loop_is_bounded() {
        let backend = ScriptedBackend::always_tool_call();
        let runner = CountingRunner::default();
        let dispatcher = dispatcher(backend.clone(), runner.clone());
        let options = GenerationOptions {
            max_tool_rounds: 5,
            ..GenerationOptions::default()
        };

        let err = dispatcher
            .dispatch(&conversation(), "openai/gpt-4o", &options)
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::ToolLoopExceeded { rounds: 5 }));
        // Five rounds executed; the sixth tool request is refused.
        assert_eq!(*runner.runs.lock().unwrap(), 5);
        assert_eq!(backend.request_count(), 6);
    }

    #[tokio::test]
    async fn test_executed_calls_survive_loop_failure() {
        let backend = ScriptedBackend::always_tool_call();
        let dispatcher = dispatcher(backend, CountingRunner::default());
        let options = GenerationOptions {
            max_tool_rounds: 3,
            ..GenerationOptions::default()
        };
        let mut executed = Vec::new();

        let err = dispatcher
            .dispatch_recording(&conversation(), "openai/gpt-4o", &options, &mut executed)
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::ToolLoopExceeded { rounds: 3 }));
        let ids: Vec<&str> = executed.iter().map(|call| call.id.as_str()).collect();
        assert_eq!(ids, vec!["call_1", "call_2", "call_3"]);
        assert!(executed.iter().all(|call| call.output.contains("ran ls")));
    }

    #[tokio::test]
    async fn test_executed_calls_survive_provider_error() {
        let backend = ScriptedBackend::replying(vec![
            Ok(tool_reply("call_1", "make")),
            Err(AssistantError::Provider("502 bad gateway".into())),
        ]);
        let dispatcher = dispatcher(backend, CountingRunner::default());
        let mut executed = Vec::new();

        let err = dispatcher
            .dispatch_recording(
                &conversation(),
                "openai/gpt-4o",
                &GenerationOptions::default(),
                &mut executed,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::Provider(_)));
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].arguments, r#"{"command":"make"}"#);
    }

    #[tokio::test]
    async fn test_zero_rounds_rejects_first_tool_request() {
        let backend = ScriptedBackend::always_tool_call();
        let runner = CountingRunner::default();
        let dispatcher = dispatcher(backend, runner.clone());
        let options = GenerationOptions {
            max_tool_rounds: 0,
            ..GenerationOptions::default()
        };

        let err = dispatcher
            .dispatch(&conversation(), "openai/gpt-4o", &options)
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::ToolLoopExceeded { rounds: 0 }));
        assert_eq!(*runner.runs.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_model_resolution_errors() {
        let backend = ScriptedBackend::default();
        let dispatcher = dispatcher(backend.clone(), CountingRunner::default());
        let options = GenerationOptions::default();

        let err = dispatcher
            .dispatch(&conversation(), "gpt-4o", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::MalformedModelSpec(_)));

        let err = dispatcher
            .dispatch(&conversation(), "anthropic/claude", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, AssistantError::UnknownProvider(ref p) if p == "anthropic"));

        assert_eq!(backend.request_count(), 0);
    }

    #[tokio::test]
    async fn test_provider_error_is_not_retried() {
        let backend = ScriptedBackend::replying(vec![Err(AssistantError::Provider(
            "401 invalid api key".into(),
        ))]);
        let dispatcher = dispatcher(backend.clone(), CountingRunner::default());

        let err = dispatcher
            .dispatch(&conversation(), "openai/gpt-4o", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::Provider(ref msg) if msg.contains("401")));
        assert_eq!(backend.request_count(), 1);
    }
}
