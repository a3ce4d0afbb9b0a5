//! sw_push, sw_notification_click and sw_sync tool implementations.

use dashcache_engine::{Effect, Engine};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;

/// Input parameters for the sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push body: a `{"title", "body"}` JSON object or plain text.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Input parameters for the sw_sync tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync tag (default: the configured tag).
    #[serde(default)]
    pub tag: Option<String>,
}

/// Effects the host should carry out.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EffectsOutput {
    pub effects: Vec<Effect>,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(engine: &Engine, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let effects = engine.on_push(params.payload.as_deref()).await;
    json_result(&EffectsOutput { effects })
}

/// Implementation of the sw_notification_click tool.
pub async fn notification_click_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let effects = engine.on_notification_click().await;
    json_result(&EffectsOutput { effects })
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(engine: &Engine, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let tag = params.tag.unwrap_or_else(|| engine.config().sync_tag.clone());
    let effects = engine.on_sync(&tag).await?;
    json_result(&EffectsOutput { effects })
}
