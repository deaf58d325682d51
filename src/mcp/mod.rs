//! Model Context Protocol (MCP) message set and tool server access.

pub mod protocol;
pub mod schema;
pub mod server;

#[cfg(feature = "mcp")]
pub mod client;

pub use protocol::{CallTool, CallToolResponse, ListTools, ListToolsResponse};
pub use schema::ToolSchema;
pub use server::ToolServer;

#[cfg(feature = "mcp")]
pub use client::McpClient;
