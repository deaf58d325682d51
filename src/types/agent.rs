//! Messages exchanged with the surrounding agent framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One structured message delivered to the adapter by another agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMessage {
    pub msg_id: Uuid,
    pub sender: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            msg_id: Uuid::new_v4(),
            sender: sender.into(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The adapter's reply to one [`AgentMessage`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentResponse {
    pub msg_id: Uuid,
    pub in_reply_to: Uuid,
    pub recipient: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl AgentResponse {
    /// Build the reply addressed back to the sender of `request`.
    pub fn reply_to(request: &AgentMessage, text: impl Into<String>) -> Self {
        Self {
            msg_id: Uuid::new_v4(),
            in_reply_to: request.msg_id,
            recipient: request.sender.clone(),
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}
