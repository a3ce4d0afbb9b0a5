//! cache_purge tool implementation.
//!
//! Deletes a whole generation, or one entry from it.

use dashcache_core::Error;
use dashcache_engine::Engine;
use dashcache_engine::fetch::resolve;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;
use crate::error::ToolError;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Generation to purge.
    pub generation: String,

    /// Delete only this request URL from the generation.
    #[serde(default)]
    pub url: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Number of generations or entries deleted.
    pub deleted: u64,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(engine: &Engine, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    if params.generation.trim().is_empty() {
        return Err(ToolError::InvalidInput("generation cannot be empty".to_string()).into());
    }
    let db = engine.db();

    let deleted = match params.url {
        Some(url) => {
            let key = resolve(engine.classifier().origin(), &url)
                .map_err(|e| ToolError::InvalidInput(e.to_string()))?
                .to_string();
            let generation = db
                .generation(&params.generation)
                .await?
                .ok_or_else(|| Error::CacheMiss(format!("no generation named {}", params.generation)))?;
            db.delete_entry(&generation, &key).await?
        }
        None => db.delete_generation(&params.generation).await?,
    };

    tracing::info!(generation = %params.generation, deleted, "cache purge");
    json_result(&CachePurgeOutput { deleted: u64::from(deleted) })
}
