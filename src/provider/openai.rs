//! OpenAI-compatible Chat Completions provider.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::AdapterConfig;
use crate::error::BridgeError;
use crate::mcp::ToolSchema;
use crate::types::{
    ConversationMessage, MessageContent, Role, ToolArguments, ToolCallRequest,
};

use super::http::{bearer_headers, shared_client, status_to_error};
use super::{CompletionProvider, CompletionRequest, Decision};

pub const DEFAULT_BASE_URL: &str = "https://api.asi1.ai/v1";

pub struct OpenAiCompatibleProvider {
    model: String,
    api_key: String,
    base_url: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AdapterConfig) -> Self {
        Self::new(
            config.model(),
            config.api_key(),
            Some(config.base_url().to_string()),
        )
    }

    fn build_request_body(&self, request: &CompletionRequest<'_>) -> serde_json::Value {
        let mut messages = Vec::with_capacity(request.history.len() + 1);
        if let Some(system) = request.settings.system_prompt.as_deref() {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.extend(request.history.iter().map(message_to_openai));

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(max) = request.settings.max_tokens {
                obj.insert("max_tokens".into(), max.into());
            }
            if let Some(temp) = request.settings.temperature {
                obj.insert("temperature".into(), temp.into());
            }
            if !request.tools.is_empty() {
                let tool_defs: Vec<serde_json::Value> =
                    request.tools.iter().map(tool_to_openai).collect();
                obj.insert("tools".into(), tool_defs.into());
            }
        }

        body
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatibleProvider {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Decision, BridgeError> {
        let body = self.build_request_body(&request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %self.model, messages = request.history.len(), tools = request.tools.len(), "chat completion");

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: ChatResponse = resp.json().await?;
        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BridgeError::Completion("no choices in completion response".into()))?;

        if let Some(call) = choice.message.tool_calls.unwrap_or_default().into_iter().next() {
            let arguments = parse_arguments(&call.function.name, call.function.arguments)?;
            let call_id = call
                .id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));
            return Ok(Decision::tool_call(
                call_id,
                ToolCallRequest::new(call.function.name, arguments),
            ));
        }

        Ok(Decision::TextAnswer(choice.message.content.unwrap_or_default()))
    }
}

fn tool_to_openai(tool: &ToolSchema) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.input_schema,
        }
    })
}

fn message_to_openai(msg: &ConversationMessage) -> serde_json::Value {
    let role = match msg.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    };

    match &msg.content {
        MessageContent::Text { text } => serde_json::json!({ "role": role, "content": text }),
        MessageContent::ToolCall(call) => serde_json::json!({
            "role": "assistant",
            "content": serde_json::Value::Null,
            "tool_calls": [{
                "id": msg.tool_call_id,
                "type": "function",
                "function": {
                    "name": call.name,
                    "arguments": serde_json::Value::Object(call.arguments.clone()).to_string(),
                }
            }],
        }),
        MessageContent::ToolResult(result) => {
            let text = result.text();
            let content = if result.is_error {
                format!("Tool error: {text}")
            } else {
                text
            };
            serde_json::json!({
                "role": "tool",
                "tool_call_id": msg.tool_call_id,
                "content": content,
            })
        }
    }
}

/// Tool arguments arrive as a JSON-encoded string (or, from some servers, a
/// bare object).
fn parse_arguments(tool: &str, raw: serde_json::Value) -> Result<ToolArguments, BridgeError> {
    let value = match raw {
        serde_json::Value::String(encoded) => {
            let trimmed = encoded.trim();
            if trimmed.is_empty() {
                return Ok(ToolArguments::new());
            }
            serde_json::from_str(trimmed).map_err(|e| {
                BridgeError::Completion(format!("invalid arguments for tool `{tool}`: {e}"))
            })?
        }
        other => other,
    };

    match value {
        serde_json::Value::Object(map) => Ok(map),
        serde_json::Value::Null => Ok(ToolArguments::new()),
        other => Err(BridgeError::Completion(format!(
            "arguments for tool `{tool}` must be a JSON object; got {other}"
        ))),
    }
}

// Chat Completions response types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Deserialize)]
struct ChatToolCall {
    id: Option<String>,
    function: ChatFunction,
}

#[derive(Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}
