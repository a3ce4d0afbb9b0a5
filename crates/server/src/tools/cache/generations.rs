//! cache_generations and cache_keys tool implementations.

use dashcache_core::{Error, GenerationStats};
use dashcache_engine::Engine;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::super::json_result;

/// Output from the cache_generations tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGenerationsOutput {
    /// Names the running version uses.
    pub current: Vec<String>,
    /// Every generation in the registry, including stale ones not yet evicted.
    pub generations: Vec<GenerationStats>,
}

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    pub generation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub generation: String,
    pub keys: Vec<String>,
}

/// Implementation of the cache_generations tool.
pub async fn generations_impl(engine: &Engine) -> Result<CallToolResult, McpError> {
    let output = CacheGenerationsOutput {
        current: engine.generations().names(),
        generations: engine.db().generation_stats().await?,
    };
    json_result(&output)
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(engine: &Engine, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let generation = engine
        .db()
        .generation(&params.generation)
        .await?
        .ok_or_else(|| Error::CacheMiss(format!("no generation named {}", params.generation)))?;
    let keys = engine.db().entry_keys(&generation).await?;
    json_result(&CacheKeysOutput { generation: generation.name, keys })
}
