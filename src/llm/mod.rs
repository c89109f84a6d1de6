//! Hosted LLM access.
//!
//! The rest of the crate talks to the model through [`LlmBackend`], so the
//! agent loop and the summarizer can run against a scripted backend in tests.

mod openai;

pub use openai::{create_client, OpenAiBackend};

use crate::error::Result;
use async_trait::async_trait;

/// A message in an LLM conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmMessage {
    System(String),
    User(String),
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolInvocation>,
    },
    Tool {
        call_id: String,
        content: String,
    },
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        LlmMessage::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        LlmMessage::User(content.into())
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    /// Call identifier, echoed back with the tool result.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// JSON-encoded arguments.
    pub arguments: String,
}

/// A tool the model may call.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// One model reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

impl LlmReply {
    /// Reply with final text and no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Receives streamed tokens as they arrive.
pub type TokenSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Chat-completion backend.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Send a conversation, optionally offering tools.
    async fn chat(&self, messages: &[LlmMessage], tools: &[ToolSpec]) -> Result<LlmReply>;

    /// Generate text for a single prompt.
    ///
    /// When `on_token` is given the response is streamed and each delta is
    /// passed to it; the full text is returned either way.
    async fn generate(&self, prompt: &str, on_token: Option<TokenSink<'_>>) -> Result<String>;
}
