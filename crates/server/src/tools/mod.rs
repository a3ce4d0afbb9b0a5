//! MCP tool implementations.
//!
//! Every tool is a thin adapter from JSON arguments to one engine hook; the
//! result is the hook's report serialized as pretty JSON text.

pub mod cache;
pub mod clients;
pub mod events;
pub mod fetch;
pub mod lifecycle;
pub mod message;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

/// Wrap a serializable tool output as a successful text result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(ToolError::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::Arc;

    use dashcache_core::{AppConfig, CacheConfig, CacheDb, Error, Request, Response, ResponseType};
    use dashcache_engine::{Engine, Network};
    use rmcp::model::CallToolResult;
    use serde::de::DeserializeOwned;

    pub const ORIGIN: &str = "https://app.test";

    /// Network that answers a fixed set of same-origin paths and is
    /// unreachable for everything else.
    pub struct StubNetwork {
        routes: HashMap<String, String>,
    }

    #[async_trait::async_trait]
    impl Network for StubNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            let key = request.cache_key();
            let body = self
                .routes
                .get(&key)
                .ok_or_else(|| Error::Network(format!("unreachable: {key}")))?;
            Ok(Response::new(200, "OK", ResponseType::Basic, body.clone().into_bytes())
                .with_header("content-type", "text/html"))
        }
    }

    /// An engine whose manifest paths all answer `page <path>`.
    pub async fn engine(manifest: &[&str]) -> Engine {
        engine_routing(manifest, manifest).await
    }

    /// An engine where only `routed` paths are reachable.
    pub async fn engine_routing(manifest: &[&str], routed: &[&str]) -> Engine {
        let routes = routed
            .iter()
            .map(|path| (format!("{ORIGIN}{path}"), format!("page {path}")))
            .collect();
        let cache = CacheConfig {
            origin: ORIGIN.into(),
            manifest: manifest.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        };
        let config = AppConfig { cache, ..Default::default() };
        let db = CacheDb::open_in_memory().await.unwrap();
        Engine::new(&config, db, Arc::new(StubNetwork { routes })).unwrap()
    }

    pub async fn activated_engine(manifest: &[&str]) -> Engine {
        let engine = engine(manifest).await;
        engine.on_install().await.unwrap();
        engine.on_activate().await.unwrap();
        engine
    }

    /// Decode the JSON text of a tool result.
    pub fn output<T: DeserializeOwned>(result: &CallToolResult) -> T {
        let content_val = serde_json::to_value(&result.content[0]).unwrap();
        let text = content_val
            .get("text")
            .and_then(|v| v.as_str())
            .expect("Expected text field in content");
        serde_json::from_str(text).unwrap()
    }
}
