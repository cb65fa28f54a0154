//! Completion backends.
//!
//! [`CompletionBackend`] is the single capability the dispatcher needs: send a
//! conversation to a provider endpoint and get one reply back. The production
//! implementation speaks the OpenAI chat-completions protocol, which OpenAI,
//! Mistral, Ollama and most hosted gateways expose, so one client covers every
//! configured provider by switching the base URL and key.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
    FunctionObject,
};
use async_trait::async_trait;
use tracing::debug;

use super::conversation::{Message, Role, ToolCallRequest};
use crate::config::ProviderConfig;
use crate::error::{AssistantError, Result};
use crate::tools::ToolDefinition;

/// One request to a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model name without the provider prefix.
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub top_p: f32,
    /// Empty when tools are disabled.
    pub tools: Vec<ToolDefinition>,
}

/// The provider's answer: final text, or tool calls to execute first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionReply {
    pub content: String,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl CompletionReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        endpoint: &ProviderConfig,
        request: &CompletionRequest,
    ) -> Result<CompletionReply>;
}

/// OpenAI-compatible chat completions over `async-openai`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiBackend;

impl OpenAiBackend {
    pub fn new() -> Self {
        Self
    }

    fn client(endpoint: &ProviderConfig) -> Client<OpenAIConfig> {
        let mut config = OpenAIConfig::new().with_api_key(endpoint.api_key.clone());
        if !endpoint.base_url.is_empty() {
            config = config.with_api_base(endpoint.base_url.trim_end_matches('/'));
        }
        Client::with_config(config)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete(
        &self,
        endpoint: &ProviderConfig,
        request: &CompletionRequest,
    ) -> Result<CompletionReply> {
        let messages = request
            .messages
            .iter()
            .map(to_openai_message)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(provider_error)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&request.model)
            .messages(messages)
            .temperature(request.temperature)
            .top_p(request.top_p);
        if !request.tools.is_empty() {
            builder.tools(request.tools.iter().map(to_openai_tool).collect::<Vec<_>>());
        }
        let chat_request = builder.build().map_err(provider_error)?;

        debug!(
            model = %request.model,
            base_url = %endpoint.base_url,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending completion request"
        );

        let response = Self::client(endpoint)
            .chat()
            .create(chat_request)
            .await
            .map_err(provider_error)?;

        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Completion usage"
            );
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::Provider("response contained no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCallRequest {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(CompletionReply {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

fn provider_error(e: OpenAIError) -> AssistantError {
    AssistantError::Provider(e.to_string())
}

fn to_openai_message(
    message: &Message,
) -> std::result::Result<ChatCompletionRequestMessage, OpenAIError> {
    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content.clone())
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content.clone())
            .build()?
            .into(),
        Role::Assistant => {
            let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
            if !message.content.is_empty() {
                builder.content(message.content.clone());
            }
            if !message.tool_calls.is_empty() {
                builder.tool_calls(
                    message
                        .tool_calls
                        .iter()
                        .map(|tc| ChatCompletionMessageToolCall {
                            id: tc.id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: tc.name.clone(),
                                arguments: tc.arguments.clone(),
                            },
                        })
                        .collect::<Vec<_>>(),
                );
            }
            builder.build()?.into()
        }
        Role::Tool => ChatCompletionRequestToolMessageArgs::default()
            .tool_call_id(message.tool_call_id.clone().unwrap_or_default())
            .content(message.content.clone())
            .build()?
            .into(),
    };
    Ok(converted)
}

fn to_openai_tool(tool: &ToolDefinition) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: tool.name.clone(),
            description: Some(tool.description.clone()),
            parameters: Some(tool.parameters.clone()),
            strict: None,
        },
    }
}
