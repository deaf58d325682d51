//! Cached view of the tools a server advertises.
//!
//! The cache is an `Arc` swapped under a short-lived lock: readers clone
//! the `Arc` and never observe a half-built set, and no lock is held while
//! waiting on the server.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{debug, warn};

use crate::error::{BridgeError, Result};
use crate::mcp::{ListTools, ListToolsResponse, ToolSchema, ToolServer};
use crate::util::timeout::with_timeout;

/// What `refresh` does when discovery fails but an older tool set exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DiscoveryFallback {
    /// Surface the discovery error.
    #[default]
    Fail,
    /// Keep serving the previous tool set and log a warning.
    UseStale,
}

/// Immutable snapshot of one discovery response.
#[derive(Debug, Default)]
pub struct ToolSet {
    tools: Vec<ToolSchema>,
    by_name: HashMap<String, usize>,
}

impl ToolSet {
    /// Build a snapshot; a repeated name keeps its last schema.
    pub fn new(tools: Vec<ToolSchema>) -> Self {
        let mut unique: Vec<ToolSchema> = Vec::with_capacity(tools.len());
        let mut by_name = HashMap::with_capacity(tools.len());
        for tool in tools {
            match by_name.get(&tool.name) {
                Some(&index) => unique[index] = tool,
                None => {
                    by_name.insert(tool.name.clone(), unique.len());
                    unique.push(tool);
                }
            }
        }
        Self {
            tools: unique,
            by_name,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.by_name.get(name).map(|&index| &self.tools[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn tools(&self) -> &[ToolSchema] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Per-adapter cache of advertised tool schemas.
#[derive(Debug)]
pub struct ToolRegistry {
    current: RwLock<Option<Arc<ToolSet>>>,
    fallback: DiscoveryFallback,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(DiscoveryFallback::default())
    }
}

impl ToolRegistry {
    pub fn new(fallback: DiscoveryFallback) -> Self {
        Self {
            current: RwLock::new(None),
            fallback,
        }
    }

    /// Issue `ListTools` and replace the cached set wholesale.
    ///
    /// On failure the previous set is left untouched. Whether the call then
    /// fails or returns the stale set depends on the [`DiscoveryFallback`].
    pub async fn refresh(&self, server: &dyn ToolServer) -> Result<Arc<ToolSet>> {
        let outcome = server.list_tools(ListTools::default()).await;
        self.apply(outcome)
    }

    /// [`refresh`](Self::refresh) with a bound on how long discovery may take.
    pub async fn refresh_within(
        &self,
        server: &dyn ToolServer,
        timeout: Duration,
    ) -> Result<Arc<ToolSet>> {
        let outcome = with_timeout(timeout, server.list_tools(ListTools::default())).await;
        self.apply(outcome)
    }

    fn apply(&self, outcome: Result<ListToolsResponse>) -> Result<Arc<ToolSet>> {
        let error = match outcome {
            Ok(response) => {
                let set = Arc::new(ToolSet::new(response.tools));
                debug!(tools = set.len(), "tool registry refreshed");
                self.replace(Arc::clone(&set));
                return Ok(set);
            }
            Err(BridgeError::Cancelled) => return Err(BridgeError::Cancelled),
            Err(error) => BridgeError::discovery(error),
        };

        match (self.fallback, self.snapshot()) {
            (DiscoveryFallback::UseStale, Some(stale)) => {
                warn!(error = %error, tools = stale.len(), "tool discovery failed, using stale tool set");
                Ok(stale)
            }
            _ => Err(error),
        }
    }

    /// Look up a tool in the current set.
    pub fn lookup(&self, name: &str) -> Option<ToolSchema> {
        self.snapshot().and_then(|set| set.get(name).cloned())
    }

    /// The current set, if discovery has succeeded at least once.
    pub fn snapshot(&self) -> Option<Arc<ToolSet>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn fallback(&self) -> DiscoveryFallback {
        self.fallback
    }

    fn replace(&self, set: Arc<ToolSet>) {
        match self.current.write() {
            Ok(mut guard) => *guard = Some(set),
            Err(poisoned) => *poisoned.into_inner() = Some(set),
        }
    }
}
