//! Generation settings passed to the completion endpoint.

use bon::Builder;
use serde::{Deserialize, Serialize};

/// Settings controlling each completion request.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationSettings {
    /// Sent ahead of the history on every request; never stored in it.
    #[builder(into)]
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}
