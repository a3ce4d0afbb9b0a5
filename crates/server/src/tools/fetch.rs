//! sw_fetch and sw_classify tool implementations.
//!
//! `sw_fetch` routes a request through the engine exactly as an intercepted
//! page request would be, so the answer may come from the network, a cache
//! generation, the offline page or the synthetic 503.

use std::collections::BTreeMap;

use dashcache_core::{Destination, Headers, Request, ResponseSource, ResponseType};
use dashcache_engine::fetch::resolve;
use dashcache_engine::{Category, Engine, StrategyKind};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::json_result;
use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the application origin.
    pub url: String,

    /// HTTP method (default: GET). Anything else bypasses the caches.
    #[serde(default = "default_method")]
    pub method: String,

    /// Treat the request as a top-level page navigation accepting HTML.
    #[serde(default)]
    pub navigate: bool,

    /// Declared destination. Guessed from the path extension when absent.
    #[serde(default)]
    pub destination: Option<Destination>,

    /// Extra request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Request body, forwarded on pass-through requests.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub response_type: ResponseType,
    /// Where the answer came from.
    pub source: ResponseSource,
    pub headers: Headers,
    /// Body decoded as UTF-8, lossily.
    pub body: String,
}

/// Input parameters for the sw_classify tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwClassifyParams {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub navigate: bool,
    #[serde(default)]
    pub destination: Option<Destination>,
}

/// Output structure for the sw_classify tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwClassifyOutput {
    pub url: String,
    /// None when the request bypasses the engine.
    pub category: Option<Category>,
    pub strategy: Option<StrategyKind>,
}

/// Build the intercepted request described by the tool arguments.
///
/// Without an explicit destination, only sub-resource extensions (style,
/// script, image, font) are guessed; everything else is a plain fetch.
pub fn build_request(origin: &Url, params: SwFetchParams) -> Result<Request, ToolError> {
    if params.method.trim().is_empty() {
        return Err(ToolError::InvalidInput("method cannot be empty".into()));
    }
    let url = resolve(origin, &params.url).map_err(|e| ToolError::InvalidInput(e.to_string()))?;

    let mut request = if params.navigate {
        Request::navigate(url)
    } else {
        let guessed = Destination::from_path(url.path());
        let destination =
            params.destination.unwrap_or(if guessed.is_subresource() { guessed } else { Destination::Empty });
        Request::get(url).with_destination(destination)
    };
    request = request.with_method(params.method.trim());
    for (name, value) in params.headers {
        request = request.with_header(&name, value);
    }
    if let Some(body) = params.body {
        request = request.with_body(body.into_bytes());
    }
    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(engine: &Engine, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(engine.classifier().origin(), params)?;
    let url = request.url.to_string();

    let response = engine.on_fetch(request).await?;
    tracing::debug!(url, status = response.status, source = ?response.source, "sw_fetch answered");

    let output = SwFetchOutput {
        url,
        status: response.status,
        status_text: response.status_text.clone(),
        response_type: response.response_type,
        source: response.source,
        headers: response.headers.clone(),
        body: response.text(),
    };
    json_result(&output)
}

/// Implementation of the sw_classify tool.
pub fn classify_impl(engine: &Engine, params: SwClassifyParams) -> Result<CallToolResult, McpError> {
    let request = build_request(
        engine.classifier().origin(),
        SwFetchParams {
            url: params.url,
            method: params.method,
            navigate: params.navigate,
            destination: params.destination,
            headers: BTreeMap::new(),
            body: None,
        },
    )?;

    let category = engine.classifier().classify(&request);
    let output = SwClassifyOutput {
        url: request.url.to_string(),
        category,
        strategy: category.map(Category::strategy),
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{ORIGIN, activated_engine, engine, output};

    fn params(url: &str) -> SwFetchParams {
        SwFetchParams {
            url: url.to_string(),
            method: default_method(),
            navigate: false,
            destination: None,
            headers: BTreeMap::new(),
            body: None,
        }
    }

    #[test]
    fn test_build_request_guesses_subresources_only() {
        let origin = Url::parse(ORIGIN).unwrap();

        let css = build_request(&origin, params("/static/css/app.css")).unwrap();
        assert_eq!(css.destination, Destination::Style);
        assert_eq!(css.url.as_str(), "https://app.test/static/css/app.css");

        let api = build_request(&origin, params("/api/orders")).unwrap();
        assert_eq!(api.destination, Destination::Empty);
        assert!(!api.accepts_html());

        let page = build_request(&origin, SwFetchParams { navigate: true, ..params("/orders") }).unwrap();
        assert_eq!(page.destination, Destination::Document);
        assert!(page.accepts_html());
    }

    #[test]
    fn test_build_request_method_and_body() {
        let origin = Url::parse(ORIGIN).unwrap();
        let request = build_request(
            &origin,
            SwFetchParams { method: "post".into(), body: Some("{}".into()), ..params("/api/orders") },
        )
        .unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(&request.body[..], b"{}");

        assert!(build_request(&origin, SwFetchParams { method: " ".into(), ..params("/") }).is_err());
    }

    #[tokio::test]
    async fn test_fetch_impl_serves_shell_from_cache() {
        let engine = activated_engine(&["/", "/static/css/app.css", "/offline.html"]).await;

        let result = fetch_impl(&engine, params("/static/css/app.css")).await.unwrap();
        let out: SwFetchOutput = output(&result);
        assert_eq!(out.status, 200);
        assert_eq!(out.source, ResponseSource::Cache);
        assert_eq!(out.body, "page /static/css/app.css");

        let result = fetch_impl(&engine, SwFetchParams { navigate: true, ..params("/") }).await.unwrap();
        let out: SwFetchOutput = output(&result);
        assert_eq!(out.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_fetch_impl_offline_falls_back() {
        let engine = activated_engine(&["/", "/offline.html"]).await;

        let result = fetch_impl(&engine, SwFetchParams { navigate: true, ..params("/reports") }).await.unwrap();
        let out: SwFetchOutput = output(&result);
        assert_eq!(out.source, ResponseSource::OfflinePage);
        assert_eq!(out.body, "page /offline.html");

    }

    #[tokio::test]
    async fn test_fetch_impl_unavailable_without_offline_page() {
        let engine = activated_engine(&["/"]).await;

        let result = fetch_impl(&engine, params("/api/orders")).await.unwrap();
        let out: SwFetchOutput = output(&result);
        assert_eq!(out.status, 503);
        assert_eq!(out.source, ResponseSource::Synthetic);
    }

    #[tokio::test]
    async fn test_fetch_impl_passthrough_error() {
        let engine = engine(&["/offline.html"]).await;
        let result = fetch_impl(&engine, params("/api/orders")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_classify_impl() {
        let engine = engine(&["/", "/offline.html"]).await;

        let out: SwClassifyOutput = output(&classify_impl(&engine, params_classify("/offline-data/orders")).unwrap());
        assert_eq!(out.category, Some(Category::OfflineData));
        assert_eq!(out.strategy, Some(StrategyKind::CacheOnly));

        let post = SwClassifyParams { method: "POST".into(), ..params_classify("/api/orders") };
        let out: SwClassifyOutput = output(&classify_impl(&engine, post).unwrap());
        assert_eq!(out.category, None);
    }

    fn params_classify(url: &str) -> SwClassifyParams {
        SwClassifyParams { url: url.to_string(), method: default_method(), navigate: false, destination: None }
    }
}
