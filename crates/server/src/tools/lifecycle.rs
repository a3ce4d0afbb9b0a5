//! sw_install, sw_activate and sw_state tool implementations.

use dashcache_engine::{ClientInfo, Engine, WorkerState};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Output structure for the sw_state tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStateOutput {
    pub version: String,
    pub state: WorkerState,
    /// Generation names the running version reads and writes.
    pub generations: Vec<String>,
    pub clients: Vec<ClientInfo>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let report = engine.on_install().await?;
    json_result(&report)
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let report = engine.on_activate().await?;
    json_result(&report)
}

/// Implementation of the sw_state tool.
pub async fn state_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let output = SwStateOutput {
        version: engine.config().version.clone(),
        state: engine.state().await,
        generations: engine.generations().names(),
        clients: engine.clients().await,
    };
    json_result(&output)
}
