//! Convenience re-exports for common use.

pub use crate::adapter::McpServerAdapter;
pub use crate::config::AdapterConfig;
pub use crate::error::{BridgeError, HandleMessageError, Result};
#[cfg(feature = "mcp")]
pub use crate::mcp::McpClient;
pub use crate::mcp::{CallTool, CallToolResponse, ListTools, ListToolsResponse, ToolSchema, ToolServer};
pub use crate::orchestrator::{
    OrchestrationFailure, OrchestrationOutcome, Orchestrator, OrchestratorState,
};
pub use crate::provider::{CompletionProvider, Decision, OpenAiCompatibleProvider};
pub use crate::registry::{DiscoveryFallback, ToolRegistry, ToolSet};
pub use crate::types::{
    AgentMessage, AgentResponse, ContentItem, ConversationHistory, ConversationMessage,
    GenerationSettings, Role, ToolCallRequest, ToolCallResult,
};
