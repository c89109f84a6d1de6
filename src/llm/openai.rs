//! OpenAI-compatible client (Groq by default).

use super::{LlmBackend, LlmMessage, LlmReply, TokenSink, ToolInvocation, ToolSpec};
use crate::config::LlmSettings;
use crate::error::{Result, ScoutError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Create a client for an OpenAI-compatible endpoint with a request timeout.
pub fn create_client(api_base: &str, api_key: &str, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder().timeout(timeout).build()?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base)
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}

/// LLM backend speaking the chat-completions API.
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAiBackend {
    /// Create a backend for `model` using the endpoint and timeout in `settings`.
    pub fn new(api_key: &str, settings: &LlmSettings, model: &str) -> Result<Self> {
        let client = create_client(
            &settings.api_base,
            api_key,
            Duration::from_secs(settings.timeout_secs),
        )?;

        Ok(Self {
            client,
            model: model.to_string(),
            temperature: settings.temperature,
        })
    }

    fn build_request(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        tools: &[ToolSpec],
    ) -> Result<CreateChatCompletionRequest> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model)
            .messages(messages)
            .temperature(self.temperature);

        if !tools.is_empty() {
            args.tools(tools.iter().map(to_openai_tool).collect::<Vec<_>>());
        }

        args.build().map_err(|e| ScoutError::Llm(e.to_string()))
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, messages, tools), fields(model = %self.model, messages = messages.len()))]
    async fn chat(&self, messages: &[LlmMessage], tools: &[ToolSpec]) -> Result<LlmReply> {
        let request = self.build_request(to_openai_messages(messages)?, tools)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ScoutError::Llm(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ScoutError::Llm("No response from model".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolInvocation {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Ok(LlmReply {
            content: choice.message.content,
            tool_calls,
        })
    }

    #[instrument(skip(self, prompt, on_token), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, on_token: Option<TokenSink<'_>>) -> Result<String> {
        let messages = to_openai_messages(&[LlmMessage::user(prompt)])?;
        let request = self.build_request(messages, &[])?;

        let Some(sink) = on_token else {
            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(|e| ScoutError::Llm(format!("Failed to generate response: {}", e)))?;

            return response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .ok_or_else(|| ScoutError::Llm("Empty response from LLM".to_string()));
        };

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| ScoutError::Llm(format!("Failed to start stream: {}", e)))?;

        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ScoutError::Llm(format!("Stream error: {}", e)))?;
            for choice in chunk.choices {
                if let Some(delta) = choice.delta.content {
                    sink(&delta);
                    text.push_str(&delta);
                }
            }
        }

        debug!("Streamed {} characters", text.len());

        if text.is_empty() {
            return Err(ScoutError::Llm("Empty response from LLM".to_string()));
        }
        Ok(text)
    }
}

fn to_openai_tool(spec: &ToolSpec) -> ChatCompletionTool {
    ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: spec.name.clone(),
            description: Some(spec.description.clone()),
            parameters: Some(spec.parameters.clone()),
            strict: None,
        },
    }
}

fn to_openai_messages(messages: &[LlmMessage]) -> Result<Vec<ChatCompletionRequestMessage>> {
    messages
        .iter()
        .map(|message| -> Result<ChatCompletionRequestMessage> {
            let converted = match message {
                LlmMessage::System(content) => ChatCompletionRequestSystemMessageArgs::default()
                    .content(content.as_str())
                    .build()
                    .map_err(|e| ScoutError::Llm(e.to_string()))?
                    .into(),
                LlmMessage::User(content) => ChatCompletionRequestUserMessageArgs::default()
                    .content(content.as_str())
                    .build()
                    .map_err(|e| ScoutError::Llm(e.to_string()))?
                    .into(),
                LlmMessage::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                    if let Some(text) = content {
                        args.content(text.as_str());
                    }
                    if !tool_calls.is_empty() {
                        args.tool_calls(
                            tool_calls
                                .iter()
                                .map(|call| ChatCompletionMessageToolCall {
                                    id: call.id.clone(),
                                    r#type: ChatCompletionToolType::Function,
                                    function: FunctionCall {
                                        name: call.name.clone(),
                                        arguments: call.arguments.clone(),
                                    },
                                })
                                .collect::<Vec<_>>(),
                        );
                    }
                    args.build()
                        .map_err(|e| ScoutError::Llm(e.to_string()))?
                        .into()
                }
                LlmMessage::Tool { call_id, content } => {
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(call_id.as_str())
                        .content(content.as_str())
                        .build()
                        .map_err(|e| ScoutError::Llm(e.to_string()))?
                        .into()
                }
            };
            Ok(converted)
        })
        .collect()
}
