//! sw_message tool implementation.
//!
//! Delivers a page message (`{"action":"skipWaiting"}`,
//! `{"type":"STORE_OFFLINE_ORDERS","ordersData":...}` or
//! `{"type":"GET_OFFLINE_ORDERS"}`) to the engine.

use dashcache_engine::{ClientMessage, Engine};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::json_result;

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// The message as the page posted it.
    pub message: Value,

    /// Whether the page attached a reply port (default: true). Without one,
    /// stores run in the background and nothing is returned.
    #[serde(default = "default_true")]
    pub reply: bool,
}

fn default_true() -> bool {
    true
}

/// Implementation of the sw_message tool.
pub async fn message_impl(engine: &Engine, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message = ClientMessage::parse(params.message)?;
    let outcome = engine.on_message(message, params.reply).await;
    json_result(&outcome)
}
