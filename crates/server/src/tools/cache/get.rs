//! cache_get tool implementation.
//!
//! Retrieves a stored response by request URL.

use dashcache_core::{Error, Headers, ResponseType};
use dashcache_engine::Engine;
use dashcache_engine::fetch::resolve;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;
use crate::error::ToolError;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Request URL, absolute or relative to the application origin.
    pub url: String,

    /// Restrict the lookup to one generation. Without it, the most recent
    /// write across all generations is returned.
    #[serde(default)]
    pub generation: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub generation: String,
    pub url: String,
    pub status: u16,
    pub response_type: ResponseType,
    pub headers: Headers,
    pub stored_at: String,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(engine: &Engine, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let key = resolve(engine.classifier().origin(), &params.url)
        .map_err(|e| ToolError::InvalidInput(e.to_string()))?
        .to_string();
    let db = engine.db();

    let stored = match params.generation {
        Some(name) => {
            let generation = db
                .generation(&name)
                .await?
                .ok_or_else(|| Error::CacheMiss(format!("no generation named {name}")))?;
            db.match_entry(&generation, &key).await?
        }
        None => db.match_any(&key).await?,
    };
    let stored = stored.ok_or_else(|| Error::CacheMiss(key))?;

    let output = CacheGetOutput {
        generation: stored.generation,
        url: stored.url,
        status: stored.status,
        response_type: stored.response_type,
        headers: stored.headers,
        stored_at: stored.stored_at,
        body: String::from_utf8_lossy(&stored.body).into_owned(),
    };
    json_result(&output)
}
