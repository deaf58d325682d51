//! Error types for the bridge.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

use crate::orchestrator::OrchestratorState;
use crate::types::ConversationHistory;

/// Primary error type for all bridge operations.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to decode conversation history {input:?}: {source}")]
    Decode {
        input: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool discovery failed: {0}")]
    Discovery(String),

    #[error("Tool invocation failed: {tool_name}: {message}")]
    ToolInvocation { tool_name: String, message: String },

    #[error("No final answer after {0} decision rounds")]
    MaxIterationsExceeded(usize),

    #[error("Completion failed: {0}")]
    Completion(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Operation cancelled")]
    Cancelled,
}

impl BridgeError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Wrap a failure raised while talking to the completion endpoint.
    pub(crate) fn completion(cause: BridgeError) -> Self {
        match cause {
            Self::Completion(_) | Self::Cancelled => cause,
            other => Self::Completion(other.to_string()),
        }
    }

    /// Wrap a failure raised while refreshing the tool list.
    pub(crate) fn discovery(cause: BridgeError) -> Self {
        match cause {
            Self::Discovery(_) | Self::Cancelled => cause,
            other => Self::Discovery(other.to_string()),
        }
    }

    /// Wrap a failure raised while invoking a tool.
    pub(crate) fn tool_invocation(tool_name: &str, cause: BridgeError) -> Self {
        match cause {
            Self::ToolInvocation { .. } | Self::Cancelled => cause,
            other => Self::ToolInvocation {
                tool_name: tool_name.to_string(),
                message: other.to_string(),
            },
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode { .. } | Self::Serialization(_) => ErrorCategory::Serialization,
            Self::UnknownTool(_) => ErrorCategory::Protocol,
            Self::Discovery(_) => ErrorCategory::Discovery,
            Self::ToolInvocation { .. } => ErrorCategory::ToolInvocation,
            Self::MaxIterationsExceeded(_) => ErrorCategory::Orchestration,
            Self::Completion(_) => ErrorCategory::Completion,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Cancelled => ErrorCategory::Cancelled,
        }
    }

    /// Whether the failure happened on the wire rather than in the protocol.
    ///
    /// A caller may choose to re-run the whole exchange on these; the bridge
    /// itself never does.
    pub fn is_transport(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Discovery
                | ErrorCategory::ToolInvocation
                | ErrorCategory::Completion
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::RateLimit
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Orchestration => RecoverySuggestion::RaiseIterationLimit,
            ErrorCategory::Protocol | ErrorCategory::Discovery => {
                RecoverySuggestion::CheckToolServer
            }
            ErrorCategory::Cancelled => RecoverySuggestion::None,
            _ if self.is_transport() => RecoverySuggestion::RetryExchange,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Failure of a whole `handle_message` call.
///
/// Carries the conversation accumulated up to the failure so the caller can
/// inspect it or resume from it.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct HandleMessageError {
    #[source]
    pub error: BridgeError,
    pub history: ConversationHistory,
    /// Orchestrator states entered before the failure. Empty when the run
    /// never started, e.g. on a discovery failure.
    pub states: Vec<OrchestratorState>,
}

impl HandleMessageError {
    pub fn new(error: BridgeError, history: ConversationHistory) -> Self {
        Self {
            error,
            history,
            states: Vec::new(),
        }
    }

    pub fn with_states(mut self, states: Vec<OrchestratorState>) -> Self {
        self.states = states;
        self
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BridgeError>;
