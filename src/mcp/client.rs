//! rmcp-backed [`ToolServer`] for real MCP servers.

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParams, CallToolResult, ClientInfo, ProtocolVersion},
    service::{ClientInitializeError, DynService, RoleClient, RunningService, ServiceError, ServiceExt},
    transport::{StreamableHttpClientTransport, TokioChildProcess},
};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::types::ContentItem;

use super::protocol::{CallTool, CallToolResponse, ListTools, ListToolsResponse};
use super::schema::ToolSchema;
use super::server::ToolServer;

type DynClientService = Box<dyn DynService<RoleClient>>;
pub type McpRunningService = RunningService<RoleClient, DynClientService>;

/// Client for one Model Context Protocol server.
pub struct McpClient {
    session: McpRunningService,
}

impl McpClient {
    /// Spawn a local MCP server and talk to it over stdio.
    pub async fn connect_stdio(
        command: impl Into<String>,
        args: Vec<String>,
    ) -> Result<Self, BridgeError> {
        let command = command.into();
        let mut cmd = Command::new(&command);
        cmd.args(&args);
        let transport = TokioChildProcess::new(cmd).map_err(|e| {
            BridgeError::Discovery(format!("failed to spawn MCP server `{command}`: {e}"))
        })?;
        debug!(command = %command, "MCP stdio server spawned");
        Self::from_running_service_result(client_info().into_dyn().serve(transport).await)
    }

    /// Connect to a remote MCP server over streamable HTTP.
    pub async fn connect_http(url: impl Into<String>) -> Result<Self, BridgeError> {
        let url = url.into();
        let transport = StreamableHttpClientTransport::from_uri(url.clone());
        debug!(url = %url, "connecting to MCP HTTP server");
        Self::from_running_service_result(client_info().into_dyn().serve(transport).await)
    }

    /// Wrap an already-running rmcp service.
    ///
    /// Initialization handshake is already handled by rmcp `serve(...)`.
    pub fn from_running_service(session: McpRunningService) -> Self {
        Self { session }
    }

    /// Convert an rmcp initialization result into a client.
    pub fn from_running_service_result(
        result: Result<McpRunningService, ClientInitializeError>,
    ) -> Result<Self, BridgeError> {
        result
            .map(Self::from_running_service)
            .map_err(map_client_initialize_error)
    }

    /// Instructions the server advertised during initialization.
    pub fn instructions(&self) -> Option<String> {
        self.session
            .peer_info()
            .and_then(|info| info.instructions.clone())
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }
}

#[async_trait]
impl ToolServer for McpClient {
    async fn list_tools(&self, _request: ListTools) -> Result<ListToolsResponse, BridgeError> {
        let tools = match self.session.list_all_tools().await {
            Ok(tools) => tools,
            Err(ServiceError::UnexpectedResponse) => {
                self.session
                    .list_tools(None)
                    .await
                    .map_err(|e| map_service_error("list_tools", e, BridgeError::Discovery))?
                    .tools
            }
            Err(e) => return Err(map_service_error("list_tools", e, BridgeError::Discovery)),
        };

        Ok(ListToolsResponse {
            tools: tools.into_iter().map(map_mcp_tool_schema).collect(),
        })
    }

    async fn call_tool(&self, request: CallTool) -> Result<CallToolResponse, BridgeError> {
        let CallTool { name, arguments } = request;
        let result = self
            .session
            .call_tool(CallToolRequestParams {
                meta: None,
                name: name.clone().into(),
                arguments: (!arguments.is_empty()).then_some(arguments),
                task: None,
            })
            .await
            .map_err(|e| {
                map_service_error("call_tool", e, |message| BridgeError::ToolInvocation {
                    tool_name: name.clone(),
                    message,
                })
            })?;

        Ok(map_call_result(result))
    }
}

fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: ProtocolVersion::LATEST,
        ..Default::default()
    }
}

fn map_mcp_tool_schema(tool: rmcp::model::Tool) -> ToolSchema {
    ToolSchema {
        name: tool.name.to_string(),
        description: tool.description.map(|d| d.to_string()).unwrap_or_default(),
        input_schema: serde_json::Value::Object((*tool.input_schema).clone()),
    }
}

fn map_call_result(result: CallToolResult) -> CallToolResponse {
    let mut content: Vec<ContentItem> = result
        .content
        .iter()
        .map(|item| match serde_json::to_value(item) {
            Ok(value) => content_item_from_value(value),
            Err(error) => {
                warn!(error = %error, "tool content did not serialize, keeping its debug form");
                ContentItem::text(format!("{item:?}"))
            }
        })
        .collect();

    if content.is_empty() {
        if let Some(structured) = result.structured_content {
            content.push(ContentItem::text(structured.to_string()));
        }
    }

    CallToolResponse {
        content,
        is_error: result.is_error.unwrap_or(false),
    }
}

/// Unrecognised content is kept as text holding the raw JSON.
fn content_item_from_value(value: serde_json::Value) -> ContentItem {
    match serde_json::from_value(value.clone()) {
        Ok(item) => item,
        Err(error) => {
            warn!(error = %error, "unrecognised tool content, keeping it as raw JSON text");
            ContentItem::text(value.to_string())
        }
    }
}

fn map_client_initialize_error(error: ClientInitializeError) -> BridgeError {
    match error {
        ClientInitializeError::ConnectionClosed(context) => {
            BridgeError::Discovery(format!("MCP initialize connection closed: {context}"))
        }
        ClientInitializeError::TransportError { error, context } => BridgeError::Discovery(
            format!("MCP initialize transport error ({context}): {error}"),
        ),
        ClientInitializeError::JsonRpcError(error) => BridgeError::Discovery(format!(
            "MCP initialize JSON-RPC error {}: {}",
            error.code.0, error.message
        )),
        ClientInitializeError::Cancelled => BridgeError::Cancelled,
        other => BridgeError::Discovery(format!("MCP initialize error: {other}")),
    }
}

fn map_service_error(
    context: &str,
    error: ServiceError,
    wrap: impl FnOnce(String) -> BridgeError,
) -> BridgeError {
    let message = match error {
        ServiceError::Timeout { timeout } => {
            return BridgeError::Timeout(timeout.as_millis() as u64)
        }
        ServiceError::McpError(error) => {
            format!("{context}: MCP error {}: {}", error.code.0, error.message)
        }
        ServiceError::TransportSend(error) => {
            format!("{context}: MCP transport send failed: {error}")
        }
        ServiceError::TransportClosed => format!("{context}: MCP transport closed"),
        ServiceError::UnexpectedResponse => format!("{context}: unexpected MCP response"),
        ServiceError::Cancelled { reason } => {
            let suffix = reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            format!("{context}: MCP request cancelled{suffix}")
        }
        other => format!("{context}: MCP service error: {other}"),
    };
    wrap(message)
}
