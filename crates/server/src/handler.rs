//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the engine hooks.
use crate::tools::{
    cache::{CacheGetParams, CacheKeysParams, CachePurgeParams, generations_impl, get_impl, keys_impl, purge_impl},
    clients::{ClientCloseParams, ClientOpenParams, close_impl, open_impl},
    events::{SwPushParams, SwSyncParams, notification_click_impl, push_impl, sync_impl},
    fetch::{SwClassifyParams, SwFetchParams, classify_impl, fetch_impl},
    lifecycle::{activate_impl, install_impl, state_impl},
    message::{SwMessageParams, message_impl},
};

use dashcache_engine::Engine;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for dashcache.
#[derive(Clone)]
pub struct DashcacheServer {
    engine: Engine,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl DashcacheServer {
    /// Create a server handler around a constructed engine.
    pub fn new(engine: Engine) -> Self {
        Self { engine, tool_router: Self::tool_router() }
    }

    #[tool(description = "Route a page request through the caching engine. \
        Returns status, headers, body and whether it came from network, cache, offline page or a synthetic 503.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.engine, params.0).await
    }

    #[tool(description = "Show which category and strategy a request would be handled with. No network access.")]
    async fn sw_classify(&self, params: Parameters<SwClassifyParams>) -> Result<CallToolResult, McpError> {
        classify_impl(&self.engine, params.0)
    }

    #[tool(description = "Deliver a page message: skipWaiting, STORE_OFFLINE_ORDERS or GET_OFFLINE_ORDERS.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.engine, params.0).await
    }

    #[tool(description = "Run the install phase: pre-cache the manifest into the current shell generation.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.engine).await
    }

    #[tool(description = "Run the activate phase: evict other versions' generations and claim open pages.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.engine).await
    }

    #[tool(description = "Report the engine version, lifecycle state, current generations and open pages.")]
    async fn sw_state(&self) -> Result<CallToolResult, McpError> {
        state_impl(&self.engine).await
    }

    #[tool(description = "Deliver a push message. Returns the notification to show.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.engine, params.0).await
    }

    #[tool(description = "A notification was clicked. Returns the window to focus or open.")]
    async fn sw_notification_click(&self) -> Result<CallToolResult, McpError> {
        notification_click_impl(&self.engine).await
    }

    #[tool(description = "Fire a background-sync event for a tag (default: the configured sync tag).")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.engine, params.0).await
    }

    #[tool(description = "Register an open page. Pages opened after activation are controlled immediately.")]
    async fn client_open(&self, params: Parameters<ClientOpenParams>) -> Result<CallToolResult, McpError> {
        open_impl(&self.engine, params.0).await
    }

    #[tool(description = "Forget a closed page.")]
    async fn client_close(&self, params: Parameters<ClientCloseParams>) -> Result<CallToolResult, McpError> {
        close_impl(&self.engine, params.0).await
    }

    #[tool(description = "Retrieve a stored response by URL, from one generation or the most recent write anywhere.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.engine, params.0).await
    }

    #[tool(description = "Delete a cache generation, or a single URL from it.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        purge_impl(&self.engine, params.0).await
    }

    #[tool(description = "List every cache generation with its entry count, marking the current ones.")]
    async fn cache_generations(&self) -> Result<CallToolResult, McpError> {
        generations_impl(&self.engine).await
    }

    #[tool(description = "List the request URLs stored in one generation.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(&self.engine, params.0).await
    }
}

impl ServerHandler for DashcacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "dashcache".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline caching engine for the orders dashboard. Use sw_fetch to route page requests \
                 and sw_message for the offline orders bridge."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
