//! Error classification and recovery.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Serialization,
    Protocol,
    Discovery,
    ToolInvocation,
    Completion,
    Orchestration,
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Cancelled,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Re-run the whole exchange; the bridge never retries on its own.
    RetryExchange,
    CheckCredentials,
    CheckConfiguration,
    CheckToolServer,
    IncreaseTimeout,
    RaiseIterationLimit,
    ContactSupport,
    None,
}
