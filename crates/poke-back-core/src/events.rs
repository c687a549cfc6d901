//! PokeAction enum — what the handler asks the host to deliver.

use serde::{Deserialize, Serialize};

use crate::types::LlmRequest;

/// Outgoing actions, pushed to the host in the order they are produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data")]
pub enum PokeAction {
    /// Plain-text chat reply
    #[serde(rename = "reply")]
    Reply { text: String },

    /// Ask the host's LLM subsystem to answer in the current conversation
    #[serde(rename = "llm_request")]
    LlmRequest(LlmRequest),
}

impl PokeAction {
    pub fn reply(text: impl Into<String>) -> Self {
        PokeAction::Reply { text: text.into() }
    }

    /// `{"action": "...", "data": {...}}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
