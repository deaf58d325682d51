//! Shared test doubles: a recording tool server and a scripted provider.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use mcp_bridge::config::AdapterConfig;
use mcp_bridge::error::{BridgeError, Result};
use mcp_bridge::mcp::{CallTool, CallToolResponse, ListTools, ListToolsResponse, ToolSchema, ToolServer};
use mcp_bridge::provider::{CompletionProvider, CompletionRequest, Decision};
use mcp_bridge::types::{ToolArguments, ToolCallRequest};

/// A tool server stub that records every request it receives.
pub struct RecordingToolServer {
    tools: Mutex<Vec<ToolSchema>>,
    responses: Mutex<HashMap<String, CallToolResponse>>,
    calls: Mutex<Vec<CallTool>>,
    listings: AtomicUsize,
    fail_discovery: AtomicBool,
    fail_after: Mutex<Option<usize>>,
    call_delay: Mutex<Option<Duration>>,
}

impl RecordingToolServer {
    pub fn new(tools: Vec<ToolSchema>) -> Self {
        Self {
            tools: Mutex::new(tools),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            listings: AtomicUsize::new(0),
            fail_discovery: AtomicBool::new(false),
            fail_after: Mutex::new(None),
            call_delay: Mutex::new(None),
        }
    }

    pub fn with_tools(names: &[&str]) -> Self {
        Self::new(names.iter().map(|name| schema(name)).collect())
    }

    /// Canned response for one tool; unlisted tools answer `"ok"`.
    pub fn respond(&self, tool: &str, response: CallToolResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(tool.to_string(), response);
    }

    pub fn set_tools(&self, tools: Vec<ToolSchema>) {
        *self.tools.lock().unwrap() = tools;
    }

    pub fn fail_discovery(&self, fail: bool) {
        self.fail_discovery.store(fail, Ordering::SeqCst);
    }

    /// Let the first `succeeding` calls through, then fail at the transport level.
    pub fn fail_calls_after(&self, succeeding: usize) {
        *self.fail_after.lock().unwrap() = Some(succeeding);
    }

    pub fn delay_calls(&self, delay: Duration) {
        *self.call_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<CallTool> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn listing_count(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ToolServer for RecordingToolServer {
    async fn list_tools(&self, _request: ListTools) -> Result<ListToolsResponse> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(BridgeError::Discovery("connection refused".into()));
        }
        Ok(ListToolsResponse {
            tools: self.tools.lock().unwrap().clone(),
        })
    }

    async fn call_tool(&self, request: CallTool) -> Result<CallToolResponse> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(request.clone());
            calls.len() - 1
        };
        let delay = *self.call_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_after.lock().unwrap().is_some_and(|limit| index >= limit) {
            return Err(BridgeError::api(502, "tool server unreachable"));
        }
        let response = self.responses.lock().unwrap().get(&request.name).cloned();
        Ok(response.unwrap_or_else(|| CallToolResponse::text("ok")))
    }
}

/// What the provider was shown on one call.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub history_len: usize,
    pub tool_names: Vec<String>,
}

/// A completion provider that replays a fixed list of decisions.
pub struct ScriptedProvider {
    decisions: Mutex<VecDeque<Result<Decision>>>,
    repeat: Option<Decision>,
    seen: Mutex<Vec<SeenRequest>>,
}

impl ScriptedProvider {
    pub fn new(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into_iter().map(Ok).collect()),
            repeat: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with the same decision.
    pub fn always(decision: Decision) -> Self {
        Self {
            decisions: Mutex::new(VecDeque::new()),
            repeat: Some(decision),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn push_error(&self, error: BridgeError) {
        self.decisions.lock().unwrap().push_back(Err(error));
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn complete(&self, request: CompletionRequest<'_>) -> Result<Decision> {
        self.seen.lock().unwrap().push(SeenRequest {
            history_len: request.history.len(),
            tool_names: request.tools.iter().map(|t| t.name.clone()).collect(),
        });
        if let Some(next) = self.decisions.lock().unwrap().pop_front() {
            return next;
        }
        match &self.repeat {
            Some(decision) => Ok(decision.clone()),
            None => Err(BridgeError::Completion("script exhausted".into())),
        }
    }
}

pub fn schema(name: &str) -> ToolSchema {
    ToolSchema::new(
        name,
        format!("The {name} tool"),
        json!({
            "type": "object",
            "properties": { "q": { "type": "string" } }
        }),
    )
}

pub fn arguments(value: serde_json::Value) -> ToolArguments {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("arguments must be an object, got {other}"),
    }
}

pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> Decision {
    Decision::tool_call(id, ToolCallRequest::new(name, arguments(args)))
}

pub fn config(max_iterations: usize) -> AdapterConfig {
    AdapterConfig::builder()
        .api_key("sk-test")
        .max_iterations(max_iterations)
        .build()
}
