//! Tool server boundary.

use async_trait::async_trait;

use crate::error::BridgeError;

use super::protocol::{CallTool, CallToolResponse, ListTools, ListToolsResponse};

/// A tool-hosting server reachable over some transport.
///
/// Implementations return `Err` only for transport-level failures. A tool
/// that ran and failed is reported as `Ok` with `is_error` set.
#[async_trait]
pub trait ToolServer: Send + Sync {
    /// Discover the tools the server currently offers.
    async fn list_tools(&self, request: ListTools) -> Result<ListToolsResponse, BridgeError>;

    /// Invoke one tool.
    async fn call_tool(&self, request: CallTool) -> Result<CallToolResponse, BridgeError>;
}
