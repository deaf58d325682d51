//! Conversation message types.

use serde::{Deserialize, Serialize};

/// String-keyed, JSON-compatible tool arguments.
pub type ToolArguments = serde_json::Map<String, serde_json::Value>;

/// A message in a conversation.
///
/// Decoding rejects a role that cannot carry the content: tool calls belong
/// to the assistant and tool results to the tool role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "WireMessage")]
pub struct ConversationMessage {
    pub role: Role,
    pub content: MessageContent,
    /// Correlates a tool-call message with its result message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ConversationMessage {
    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text { text: text.into() },
            tool_call_id: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text { text: text.into() },
            tool_call_id: None,
        }
    }

    /// Create the assistant message recording a tool-call request.
    pub fn tool_call(id: impl Into<String>, request: ToolCallRequest) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::ToolCall(request),
            tool_call_id: Some(id.into()),
        }
    }

    /// Create a tool result message.
    pub fn tool_result(id: impl Into<String>, result: ToolCallResult) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::ToolResult(result),
            tool_call_id: Some(id.into()),
        }
    }

    /// Plain text content, if this is a text message.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_call(&self) -> Option<&ToolCallRequest> {
        match &self.content {
            MessageContent::ToolCall(request) => Some(request),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolCallResult> {
        match &self.content {
            MessageContent::ToolResult(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct WireMessage {
    role: Role,
    content: MessageContent,
    #[serde(default)]
    tool_call_id: Option<String>,
}

impl TryFrom<WireMessage> for ConversationMessage {
    type Error = String;

    fn try_from(wire: WireMessage) -> Result<Self, Self::Error> {
        let allowed = match &wire.content {
            MessageContent::Text { .. } => matches!(wire.role, Role::User | Role::Assistant),
            MessageContent::ToolCall(_) => wire.role == Role::Assistant,
            MessageContent::ToolResult(_) => wire.role == Role::Tool,
        };
        if !allowed {
            return Err(format!(
                "role `{}` cannot carry {} content",
                wire.role.as_str(),
                wire.content.kind()
            ));
        }
        Ok(Self {
            role: wire.role,
            content: wire.content,
            tool_call_id: wire.tool_call_id,
        })
    }
}

/// Conversation role.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// Message payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    ToolCall(ToolCallRequest),
    ToolResult(ToolCallResult),
}

impl MessageContent {
    /// The wire tag of this payload.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::ToolCall(_) => "tool_call",
            Self::ToolResult(_) => "tool_result",
        }
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    pub fn new(name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// The outcome of one tool invocation, as reported by the tool server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub content: Vec<ContentItem>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Render the result as text for the model.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(ContentItem::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One item of tool output, tagged by its content kind.
///
/// Kinds other than `text` keep their payload as-is so unknown kinds survive
/// a round trip.
///
/// The payload never carries a `type` key of its own; it would collide with
/// the kind tag on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(flatten)]
    payload: serde_json::Map<String, serde_json::Value>,
}

impl ContentItem {
    /// Create an item of any kind. A `type` key in `payload` is dropped.
    pub fn new(
        kind: impl Into<String>,
        mut payload: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        payload.remove("type");
        Self {
            kind: kind.into(),
            payload,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.payload
    }

    /// Create a `text` item.
    pub fn text(text: impl Into<String>) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert("text".into(), serde_json::Value::String(text.into()));
        Self {
            kind: "text".into(),
            payload,
        }
    }

    /// Create an `image` item from base64 data.
    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert("data".into(), serde_json::Value::String(data.into()));
        payload.insert(
            "mimeType".into(),
            serde_json::Value::String(mime_type.into()),
        );
        Self {
            kind: "image".into(),
            payload,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if self.kind != "text" {
            return None;
        }
        self.payload.get("text").and_then(|v| v.as_str())
    }

    fn render(&self) -> String {
        if let Some(text) = self.as_text() {
            return text.to_string();
        }
        let field = |key: &str| self.payload.get(key).and_then(|v| v.as_str());
        match self.kind.as_str() {
            "image" | "audio" => format!("[{}: {}]", self.kind, field("mimeType").unwrap_or("unknown")),
            "resource" => {
                let resource = self.payload.get("resource");
                let text = resource.and_then(|r| r.get("text")).and_then(|v| v.as_str());
                let uri = resource.and_then(|r| r.get("uri")).and_then(|v| v.as_str());
                match (uri, text) {
                    (Some(uri), Some(text)) => format!("{uri}\n{text}"),
                    (Some(uri), None) => uri.to_string(),
                    (None, Some(text)) => text.to_string(),
                    (None, None) => "[resource]".to_string(),
                }
            }
            other => format!("[{other}]"),
        }
    }
}

/// The ordered messages of one exchange; the unit of serialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ConversationHistory(Vec<ConversationMessage>);

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a history from the requesting agent's message.
    pub fn seeded(user_text: impl Into<String>) -> Self {
        Self(vec![ConversationMessage::user(user_text)])
    }

    pub fn push(&mut self, message: ConversationMessage) {
        self.0.push(message);
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConversationMessage> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.0.last()
    }

    pub fn into_messages(self) -> Vec<ConversationMessage> {
        self.0
    }

    /// Every tool result answers exactly one earlier tool call with the same id.
    pub fn is_correlated(&self) -> bool {
        let mut open: Vec<&str> = Vec::new();
        let mut answered: Vec<&str> = Vec::new();
        for message in &self.0 {
            let id = message.tool_call_id.as_deref();
            match (&message.content, id) {
                (MessageContent::ToolCall(_), Some(id)) => {
                    if open.contains(&id) || answered.contains(&id) {
                        return false;
                    }
                    open.push(id);
                }
                (MessageContent::ToolResult(_), Some(id)) => {
                    let Some(pos) = open.iter().position(|o| *o == id) else {
                        return false;
                    };
                    answered.push(open.remove(pos));
                }
                (MessageContent::ToolCall(_) | MessageContent::ToolResult(_), None) => {
                    return false
                }
                _ => {}
            }
        }
        true
    }
}

impl From<Vec<ConversationMessage>> for ConversationHistory {
    fn from(messages: Vec<ConversationMessage>) -> Self {
        Self(messages)
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a ConversationMessage;
    type IntoIter = std::slice::Iter<'a, ConversationMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
