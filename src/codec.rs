//! Textual wire format for conversation histories.
//!
//! A history is encoded as a compact JSON array of messages. The empty
//! string decodes to an empty history as a special case; any other input
//! must be a well-formed array.

use crate::error::{BridgeError, Result};
use crate::types::ConversationHistory;

/// Canonical encoding of an empty history.
pub const EMPTY_HISTORY: &str = "[]";

/// Encode a history.
pub fn serialize(history: &ConversationHistory) -> Result<String> {
    if history.is_empty() {
        return Ok(EMPTY_HISTORY.to_string());
    }
    Ok(serde_json::to_string(history)?)
}

/// Decode a history produced by [`serialize`].
pub fn deserialize(wire: &str) -> Result<ConversationHistory> {
    if wire.is_empty() {
        return Ok(ConversationHistory::new());
    }
    serde_json::from_str(wire).map_err(|source| BridgeError::Decode {
        input: wire.to_string(),
        source,
    })
}
