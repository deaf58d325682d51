//! Completion provider trait and the OpenAI-compatible implementation.

pub mod http;
pub mod openai;

pub use openai::OpenAiCompatibleProvider;

use async_trait::async_trait;

use crate::error::BridgeError;
use crate::mcp::ToolSchema;
use crate::types::{ConversationHistory, GenerationSettings, ToolCallRequest};

/// A request for one decision.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub history: &'a ConversationHistory,
    pub tools: &'a [ToolSchema],
    pub settings: &'a GenerationSettings,
}

/// The model's output for one orchestration round.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Final answer; ends orchestration.
    TextAnswer(String),
    /// Request to invoke a tool; `call_id` correlates the eventual result.
    ToolCall {
        call_id: String,
        request: ToolCallRequest,
    },
}

impl Decision {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextAnswer(text.into())
    }

    pub fn tool_call(call_id: impl Into<String>, request: ToolCallRequest) -> Self {
        Self::ToolCall {
            call_id: call_id.into(),
            request,
        }
    }
}

/// The LLM "chat completion" capability.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// The model identifier requests are sent to.
    fn model_id(&self) -> &str;

    /// Ask the model to answer or pick a tool.
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Decision, BridgeError>;
}
