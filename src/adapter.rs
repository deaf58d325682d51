//! The agent-facing adapter: one incoming message in, one answer out.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::AdapterConfig;
use crate::error::{BridgeError, HandleMessageError, Result};
use crate::mcp::{CallTool, CallToolResponse, ListTools, ListToolsResponse, ToolServer};
use crate::orchestrator::{OrchestrationOutcome, Orchestrator};
use crate::provider::{CompletionProvider, OpenAiCompatibleProvider};
use crate::registry::{ToolRegistry, ToolSet};
use crate::types::{AgentMessage, AgentResponse, ConversationHistory};
use crate::util::timeout::{bounded, cancellable};

/// Bridges agent messages to an MCP tool server through an LLM.
///
/// The adapter is `Send + Sync` and meant to be shared behind an `Arc`.
/// Concurrent calls each own their conversation; only the tool registry is
/// shared, and it is swapped atomically on refresh.
pub struct McpServerAdapter {
    config: Arc<AdapterConfig>,
    server: Arc<dyn ToolServer>,
    registry: ToolRegistry,
    orchestrator: Orchestrator,
}

impl McpServerAdapter {
    /// Build an adapter around an explicit completion provider.
    pub fn new(
        server: Arc<dyn ToolServer>,
        provider: Arc<dyn CompletionProvider>,
        config: AdapterConfig,
    ) -> Result<Self> {
        config.validate()?;
        let orchestrator = Orchestrator::from_config(provider, Arc::clone(&server), &config);
        Ok(Self {
            registry: ToolRegistry::new(config.discovery_fallback()),
            config: Arc::new(config),
            server,
            orchestrator,
        })
    }

    /// Build an adapter that talks to the configured OpenAI-compatible endpoint.
    pub fn with_openai(server: Arc<dyn ToolServer>, config: AdapterConfig) -> Result<Self> {
        let provider = Arc::new(OpenAiCompatibleProvider::from_config(&config));
        Self::new(server, provider, config)
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub async fn handle_message(
        &self,
        message: &AgentMessage,
    ) -> std::result::Result<AgentResponse, HandleMessageError> {
        self.handle_message_with_cancel(message, &CancellationToken::new())
            .await
    }

    /// Answer one agent message: refresh the tools, then run the decision loop.
    ///
    /// On failure the error carries the conversation as it stood, including
    /// any tool exchanges that completed.
    pub async fn handle_message_with_cancel(
        &self,
        message: &AgentMessage,
        cancel: &CancellationToken,
    ) -> std::result::Result<AgentResponse, HandleMessageError> {
        info!(msg_id = %message.msg_id, sender = %message.sender, "handling agent message");
        let mut history = ConversationHistory::seeded(message.text.clone());

        let tools = match self.discover(cancel).await {
            Ok(tools) => tools,
            Err(error) => return Err(HandleMessageError::new(error, history)),
        };
        let outcome = match self
            .orchestrator
            .run_traced(&mut history, &tools, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(failure) => {
                return Err(HandleMessageError::new(failure.error, history)
                    .with_states(failure.states));
            }
        };

        debug!(
            msg_id = %message.msg_id,
            rounds = outcome.rounds,
            messages = history.len(),
            "agent message answered"
        );
        Ok(AgentResponse::reply_to(message, outcome.answer))
    }

    /// Run the full exchange over a caller-supplied history.
    ///
    /// The history is extended in place whether or not the run succeeds.
    pub async fn converse(
        &self,
        history: &mut ConversationHistory,
        cancel: &CancellationToken,
    ) -> Result<OrchestrationOutcome> {
        let tools = self.discover(cancel).await?;
        self.orchestrator
            .run_with_cancel(history, &tools, cancel)
            .await
    }

    /// Refresh the registry and return what the server advertises.
    pub async fn handle_list_tools(&self, _request: ListTools) -> Result<ListToolsResponse> {
        let tools = self.discover(&CancellationToken::new()).await?;
        Ok(ListToolsResponse {
            tools: tools.tools().to_vec(),
        })
    }

    /// Forward one tool call, checked against the registry first.
    ///
    /// The registry is populated on first use; afterwards the cached set is
    /// authoritative until the next refresh.
    pub async fn handle_call_tool(&self, request: CallTool) -> Result<CallToolResponse> {
        let tools = match self.registry.snapshot() {
            Some(tools) => tools,
            None => self.discover(&CancellationToken::new()).await?,
        };
        if !tools.contains(&request.name) {
            return Err(BridgeError::UnknownTool(request.name));
        }

        let name = request.name.clone();
        debug!(tool = %name, "forwarding tool call");
        bounded(
            self.config.request_timeout(),
            &CancellationToken::new(),
            self.server.call_tool(request),
        )
        .await
        .map_err(|e| BridgeError::tool_invocation(&name, e))
    }

    async fn discover(&self, cancel: &CancellationToken) -> Result<Arc<ToolSet>> {
        let refresh = self
            .registry
            .refresh_within(self.server.as_ref(), self.config.request_timeout());
        cancellable(cancel, refresh).await
    }
}
