//! Bounded decision loop between the completion provider and the tool server.
//!
//! One run walks `AwaitingDecision -> (ToolRequested -> ToolExecuted ->
//! AwaitingDecision)* -> Done`, or stops in `Failed`. The history is mutated
//! in place, so whatever was appended before a failure stays visible to the
//! caller.

use std::sync::Arc;
use std::time::Duration;

use bon::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{AdapterConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{BridgeError, Result};
use crate::mcp::{CallTool, ToolServer};
use crate::provider::{CompletionProvider, CompletionRequest, Decision};
use crate::registry::ToolSet;
use crate::types::{ConversationHistory, ConversationMessage, GenerationSettings, ToolCallResult};
use crate::util::timeout::bounded;

/// States of one orchestration run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrchestratorState {
    AwaitingDecision,
    ToolRequested,
    ToolExecuted,
    Done,
    Failed,
}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestrationOutcome {
    /// The model's final text answer.
    pub answer: String,
    /// Decision rounds used, i.e. completion calls made.
    pub rounds: usize,
    /// Every state entered, in order.
    pub states: Vec<OrchestratorState>,
}

/// What a failed run got through before stopping.
#[derive(Error, Debug)]
#[error("{error}")]
pub struct OrchestrationFailure {
    #[source]
    pub error: BridgeError,
    /// Decision rounds used before the failure.
    pub rounds: usize,
    /// Every state entered; the last one is `Failed`.
    pub states: Vec<OrchestratorState>,
}

impl From<OrchestrationFailure> for BridgeError {
    fn from(failure: OrchestrationFailure) -> Self {
        failure.error
    }
}

#[derive(Default)]
struct Progress {
    rounds: usize,
    states: Vec<OrchestratorState>,
}

impl Progress {
    fn enter(&mut self, state: OrchestratorState) {
        self.states.push(state);
    }
}

/// Drives decision rounds until the model answers in text.
#[derive(Builder)]
pub struct Orchestrator {
    provider: Arc<dyn CompletionProvider>,
    server: Arc<dyn ToolServer>,
    #[builder(default = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,
    #[builder(default = DEFAULT_REQUEST_TIMEOUT)]
    timeout: Duration,
    #[builder(default)]
    settings: GenerationSettings,
}

impl Orchestrator {
    pub fn from_config(
        provider: Arc<dyn CompletionProvider>,
        server: Arc<dyn ToolServer>,
        config: &AdapterConfig,
    ) -> Self {
        Self {
            provider,
            server,
            max_iterations: config.max_iterations(),
            timeout: config.request_timeout(),
            settings: config.settings().clone(),
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub async fn run(
        &self,
        history: &mut ConversationHistory,
        tools: &ToolSet,
    ) -> Result<OrchestrationOutcome> {
        self.run_with_cancel(history, tools, &CancellationToken::new())
            .await
    }

    /// Run until a text answer, an error, the iteration ceiling, or `cancel`.
    ///
    /// Nothing is retried. A failed completion surfaces as
    /// [`BridgeError::Completion`] and a failed tool transport as
    /// [`BridgeError::ToolInvocation`]; a tool that reports `is_error` is
    /// not a failure and its result goes back to the model.
    pub async fn run_with_cancel(
        &self,
        history: &mut ConversationHistory,
        tools: &ToolSet,
        cancel: &CancellationToken,
    ) -> Result<OrchestrationOutcome> {
        self.run_traced(history, tools, cancel)
            .await
            .map_err(BridgeError::from)
    }

    /// Like [`run_with_cancel`](Self::run_with_cancel), but a failure keeps
    /// the rounds used and the state trace, which ends in `Failed`.
    pub async fn run_traced(
        &self,
        history: &mut ConversationHistory,
        tools: &ToolSet,
        cancel: &CancellationToken,
    ) -> std::result::Result<OrchestrationOutcome, OrchestrationFailure> {
        let mut progress = Progress::default();
        match self.drive(history, tools, cancel, &mut progress).await {
            Ok(answer) => Ok(OrchestrationOutcome {
                answer,
                rounds: progress.rounds,
                states: progress.states,
            }),
            Err(error) => {
                progress.enter(OrchestratorState::Failed);
                if matches!(error, BridgeError::Cancelled) {
                    debug!(rounds = progress.rounds, states = ?progress.states, "orchestration cancelled");
                } else {
                    debug!(rounds = progress.rounds, states = ?progress.states, error = %error, "orchestration failed");
                }
                Err(OrchestrationFailure {
                    error,
                    rounds: progress.rounds,
                    states: progress.states,
                })
            }
        }
    }

    async fn drive(
        &self,
        history: &mut ConversationHistory,
        tools: &ToolSet,
        cancel: &CancellationToken,
        progress: &mut Progress,
    ) -> Result<String> {
        loop {
            if cancel.is_cancelled() {
                return Err(BridgeError::Cancelled);
            }
            if progress.rounds == self.max_iterations {
                warn!(limit = self.max_iterations, "iteration ceiling reached without an answer");
                return Err(BridgeError::MaxIterationsExceeded(self.max_iterations));
            }
            progress.rounds += 1;
            progress.enter(OrchestratorState::AwaitingDecision);

            debug!(
                round = progress.rounds,
                model = self.provider.model_id(),
                messages = history.len(),
                tools = tools.len(),
                "requesting decision"
            );
            let request = CompletionRequest {
                history: &*history,
                tools: tools.tools(),
                settings: &self.settings,
            };
            let decision = bounded(self.timeout, cancel, self.provider.complete(request))
                .await
                .map_err(BridgeError::completion)?;

            let (call_id, request) = match decision {
                Decision::TextAnswer(text) => {
                    history.push(ConversationMessage::assistant(text.clone()));
                    progress.enter(OrchestratorState::Done);
                    return Ok(text);
                }
                Decision::ToolCall { call_id, request } => (call_id, request),
            };

            if !tools.contains(&request.name) {
                return Err(BridgeError::UnknownTool(request.name));
            }
            progress.enter(OrchestratorState::ToolRequested);

            debug!(tool = %request.name, round = progress.rounds, call_id = %call_id, "dispatching tool call");
            let response = bounded(
                self.timeout,
                cancel,
                self.server.call_tool(CallTool::from(request.clone())),
            )
            .await
            .map_err(|e| BridgeError::tool_invocation(&request.name, e))?;

            let result = ToolCallResult::from(response);
            if result.is_error {
                warn!(tool = %request.name, "tool reported an error");
            }
            history.push(ConversationMessage::tool_call(call_id.clone(), request));
            history.push(ConversationMessage::tool_result(call_id, result));
            progress.enter(OrchestratorState::ToolExecuted);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::{CallToolResponse, ListTools, ListToolsResponse, ToolSchema};
    use crate::types::ToolArguments;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Script {
        decisions: Mutex<VecDeque<Result<Decision>>>,
        calls: AtomicUsize,
    }

    impl Script {
        fn new(decisions: Vec<Result<Decision>>) -> Arc<Self> {
            Arc::new(Self {
                decisions: Mutex::new(decisions.into()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for Script {
        fn model_id(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _request: CompletionRequest<'_>) -> Result<Decision> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.decisions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Decision::text("script exhausted")))
        }
    }

    /// Answers every call with the same response and counts them.
    struct Echo {
        response: CallToolResponse,
        calls: AtomicUsize,
    }

    impl Echo {
        fn new(response: CallToolResponse) -> Arc<Self> {
            Arc::new(Self {
                response,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ToolServer for Echo {
        async fn list_tools(&self, _request: ListTools) -> Result<ListToolsResponse> {
            Ok(ListToolsResponse { tools: vec![] })
        }

        async fn call_tool(&self, _request: CallTool) -> Result<CallToolResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
    }

    fn search_call(id: &str) -> Decision {
        let mut arguments = ToolArguments::new();
        arguments.insert("q".into(), json!("x"));
        Decision::tool_call(id, crate::types::ToolCallRequest::new("search", arguments))
    }

    fn search_tools() -> ToolSet {
        ToolSet::new(vec![ToolSchema::new("search", "", json!({"type": "object"}))])
    }

    fn orchestrator(provider: Arc<Script>, server: Arc<Echo>, limit: usize) -> Orchestrator {
        Orchestrator::builder()
            .provider(provider)
            .server(server)
            .max_iterations(limit)
            .build()
    }

    #[tokio::test]
    async fn direct_answer_finishes_in_one_round() {
        let provider = Script::new(vec![Ok(Decision::text("hi"))]);
        let server = Echo::new(CallToolResponse::text("unused"));
        let mut history = ConversationHistory::new();

        let outcome = orchestrator(provider, server.clone(), 3)
            .run(&mut history, &search_tools())
            .await
            .unwrap();

        assert_eq!(outcome.answer, "hi");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(
            outcome.states,
            vec![OrchestratorState::AwaitingDecision, OrchestratorState::Done]
        );
        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].text(), Some("hi"));
        assert_eq!(server.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tool_round_appends_correlated_pair() {
        let provider = Script::new(vec![Ok(search_call("call_1")), Ok(Decision::text("done"))]);
        let server = Echo::new(CallToolResponse::text("result"));
        let mut history = ConversationHistory::seeded("find x");

        let outcome = orchestrator(provider.clone(), server.clone(), 5)
            .run(&mut history, &search_tools())
            .await
            .unwrap();

        assert_eq!(outcome.rounds, 2);
        assert_eq!(
            outcome.states,
            vec![
                OrchestratorState::AwaitingDecision,
                OrchestratorState::ToolRequested,
                OrchestratorState::ToolExecuted,
                OrchestratorState::AwaitingDecision,
                OrchestratorState::Done,
            ]
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(server.calls.load(Ordering::SeqCst), 1);
        assert_eq!(history.len(), 4);
        assert_eq!(history.messages()[1].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(history.messages()[2].as_tool_result().unwrap().text(), "result");
        assert!(history.is_correlated());
    }

    #[tokio::test]
    async fn unknown_tool_fails_before_dispatch() {
        let mut arguments = ToolArguments::new();
        arguments.insert("a".into(), json!(1));
        let provider = Script::new(vec![Ok(Decision::tool_call(
            "call_1",
            crate::types::ToolCallRequest::new("unknown_tool", arguments),
        ))]);
        let server = Echo::new(CallToolResponse::text("unused"));
        let mut history = ConversationHistory::seeded("hello");

        let err = orchestrator(provider, server.clone(), 5)
            .run(&mut history, &search_tools())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::UnknownTool(name) if name == "unknown_tool"));
        assert_eq!(server.calls.load(Ordering::SeqCst), 0);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn ceiling_is_hit_exactly_at_the_bound() {
        let provider = Script::new((0..10).map(|i| Ok(search_call(&format!("call_{i}")))).collect());
        let server = Echo::new(CallToolResponse::text("again"));
        let mut history = ConversationHistory::seeded("loop forever");

        let err = orchestrator(provider.clone(), server.clone(), 3)
            .run(&mut history, &search_tools())
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::MaxIterationsExceeded(3)));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
        assert_eq!(server.calls.load(Ordering::SeqCst), 3);
        assert_eq!(history.len(), 1 + 3 * 2);
    }

    #[tokio::test]
    async fn tool_reported_errors_go_back_to_the_model() {
        let provider = Script::new(vec![Ok(search_call("call_1")), Ok(Decision::text("sorry"))]);
        let server = Echo::new(CallToolResponse::error("quota exceeded"));
        let mut history = ConversationHistory::seeded("find x");

        let outcome = orchestrator(provider, server, 5)
            .run(&mut history, &search_tools())
            .await
            .unwrap();

        assert_eq!(outcome.answer, "sorry");
        assert!(history.messages()[2].as_tool_result().unwrap().is_error);
    }

    #[tokio::test]
    async fn provider_failure_is_wrapped_and_keeps_history() {
        let provider = Script::new(vec![
            Ok(search_call("call_1")),
            Err(BridgeError::api(503, "overloaded")),
        ]);
        let server = Echo::new(CallToolResponse::text("result"));
        let mut history = ConversationHistory::seeded("find x");

        let err = orchestrator(provider, server, 5)
            .run(&mut history, &search_tools())
            .await
            .unwrap_err();

        assert!(matches!(&err, BridgeError::Completion(message) if message.contains("503")));
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn cancelled_token_stops_before_first_round() {
        let provider = Script::new(vec![Ok(Decision::text("never"))]);
        let server = Echo::new(CallToolResponse::text("unused"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut history = ConversationHistory::seeded("hi");

        let err = orchestrator(provider.clone(), server, 5)
            .run_with_cancel(&mut history, &search_tools(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, BridgeError::Cancelled));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_run_keeps_its_trace() {
        let provider = Script::new(vec![
            Ok(search_call("call_1")),
            Err(BridgeError::api(500, "boom")),
        ]);
        let server = Echo::new(CallToolResponse::text("result"));
        let mut history = ConversationHistory::seeded("find x");

        let failure = orchestrator(provider, server, 5)
            .run_traced(&mut history, &search_tools(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(failure.error, BridgeError::Completion(_)));
        assert_eq!(failure.rounds, 2);
        assert_eq!(
            failure.states,
            vec![
                OrchestratorState::AwaitingDecision,
                OrchestratorState::ToolRequested,
                OrchestratorState::ToolExecuted,
                OrchestratorState::AwaitingDecision,
                OrchestratorState::Failed,
            ]
        );
    }

    #[test]
    fn states_render_in_snake_case() {
        assert_eq!(OrchestratorState::AwaitingDecision.to_string(), "awaiting_decision");
        assert_eq!(OrchestratorState::ToolExecuted.as_ref(), "tool_executed");
    }
}
