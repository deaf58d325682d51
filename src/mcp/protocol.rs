//! Request/response vocabulary exchanged with a tool server.

use serde::{Deserialize, Serialize};

use crate::types::{ContentItem, ToolArguments, ToolCallRequest, ToolCallResult};

use super::schema::ToolSchema;

/// Discovery request.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListTools {}

/// Discovery response: the complete set of tools the server offers right now.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListToolsResponse {
    pub tools: Vec<ToolSchema>,
}

/// Invocation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallTool {
    pub name: String,
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl CallTool {
    pub fn new(name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

impl From<ToolCallRequest> for CallTool {
    fn from(request: ToolCallRequest) -> Self {
        Self {
            name: request.name,
            arguments: request.arguments,
        }
    }
}

/// Invocation response.
///
/// `is_error` means the tool ran and reported a failure. A call that never
/// produced a response is a transport error instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CallToolResponse {
    pub content: Vec<ContentItem>,
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem::text(text)],
            is_error: true,
        }
    }
}

impl From<CallToolResponse> for ToolCallResult {
    fn from(response: CallToolResponse) -> Self {
        Self {
            content: response.content,
            is_error: response.is_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_tools_is_an_empty_record() {
        assert_eq!(serde_json::to_value(ListTools::default()).unwrap(), json!({}));
    }

    #[test]
    fn call_tool_response_uses_is_error_wire_name() {
        let response = CallToolResponse::error("Error occurred");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0], json!({"type": "text", "text": "Error occurred"}));

        let parsed: CallToolResponse =
            serde_json::from_value(json!({"content": [{"type": "text", "text": "Success"}]}))
                .unwrap();
        assert!(!parsed.is_error);
        assert_eq!(parsed.content[0].as_text(), Some("Success"));
    }

    #[test]
    fn call_tool_keeps_arguments() {
        let mut arguments = ToolArguments::new();
        arguments.insert("arg1".into(), json!("value1"));
        let msg = CallTool::from(ToolCallRequest::new("test_tool", arguments.clone()));
        assert_eq!(msg.name, "test_tool");
        assert_eq!(msg.arguments, arguments);
    }

    #[test]
    fn response_converts_into_result() {
        let result: ToolCallResult = CallToolResponse::error("boom").into();
        assert!(result.is_error);
        assert_eq!(result.text(), "boom");
    }
}
