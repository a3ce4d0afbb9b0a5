//! client_open and client_close tool implementations.

use dashcache_engine::Engine;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for the client_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientOpenParams {
    /// Page URL, absolute or relative to the application origin.
    pub url: String,
}

/// Input parameters for the client_close tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseParams {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientCloseOutput {
    pub closed: bool,
}

/// Implementation of the client_open tool.
pub async fn open_impl(engine: &Engine, params: ClientOpenParams) -> Result<CallToolResult, McpError> {
    let client = engine.open_client(&params.url).await?;
    json_result(&client)
}

/// Implementation of the client_close tool.
pub async fn close_impl(engine: &Engine, params: ClientCloseParams) -> Result<CallToolResult, McpError> {
    let closed = engine.close_client(&params.id).await;
    json_result(&ClientCloseOutput { closed })
}
