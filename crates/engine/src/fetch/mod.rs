//! Network access for the engine.
//!
//! ### Network seam
//! Every strategy talks to the network through the [`Network`] trait, so a
//! scripted double can stand in for it in tests.
//!
//! ### Response exposure
//! - Same-origin responses are `basic` and fully inspectable.
//! - Cross-origin `no-cors` responses are `opaque`.
//! - Other cross-origin responses are `cors`.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: configurable (default 10MB)
//! - Timeouts and oversize bodies count as network failures.

pub mod url;

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::{Client, Method, Url};

pub use self::url::{UrlError, canonicalize, resolve, same_origin};

use dashcache_core::{AppConfig, Error, Headers, Request, RequestMode, Response, ResponseType};

/// Something that can answer a [`Request`] from the network.
///
/// HTTP error statuses are ordinary responses. `Err` means the network
/// itself failed: unreachable, timed out or over the byte limit.
#[async_trait::async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "dashcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 10MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Application origin, used to decide the response type.
    pub origin: Url,
}

impl FetchConfig {
    /// Build the fetch configuration from the loaded application config.
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.cache.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            max_redirects: 5,
            origin,
        })
    }
}

/// HTTP client backing [`Network`] in production.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn response_type(&self, request: &Request) -> ResponseType {
        if same_origin(&self.config.origin, &request.url) {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        }
    }
}

fn send_error(err: &reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait::async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let mut builder = self.http.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await.map_err(|e| send_error(&e))?;

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status();
        let mut headers = Headers::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }

        let bytes: Bytes = response.bytes().await.map_err(|e| send_error(&e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), self.config.max_bytes)));
        }

        let response_type = self.response_type(request);
        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            response_type = response_type.as_str(),
            bytes = bytes.len(),
            fetch_ms,
            "fetched"
        );

        // Opaque responses hide their status.
        let mut out = if response_type == ResponseType::Opaque {
            Response::new(0, "", response_type, bytes)
        } else {
            Response::new(status.as_u16(), status.canonical_reason().unwrap_or(""), response_type, bytes)
        };
        out.headers = headers;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashcache_core::Destination;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, max_bytes: usize) -> FetchClient {
        let config = FetchConfig {
            user_agent: "dashcache-test".into(),
            max_bytes,
            timeout: Duration::from_millis(2000),
            max_redirects: 5,
            origin: Url::parse(&server.uri()).unwrap(),
        };
        FetchClient::new(config).unwrap()
    }

    #[test]
    fn test_fetch_config_from_app() {
        let config = FetchConfig::from_app(&AppConfig::default()).unwrap();
        assert_eq!(config.user_agent, "dashcache/0.1");
        assert_eq!(config.max_bytes, 10 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
        assert_eq!(config.origin.as_str(), "http://localhost:5000/");
    }

    #[tokio::test]
    async fn test_same_origin_response_is_basic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/static/css/main.css"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("body{}", "text/css"))
            .mount(&server)
            .await;

        let client = client_for(&server, 1024);
        let url = Url::parse(&format!("{}/static/css/main.css", server.uri())).unwrap();
        let request = Request::get(url).with_destination(Destination::Style);
        let response = client.fetch(&request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.response_type, ResponseType::Basic);
        assert_eq!(response.content_type(), Some("text/css"));
        assert_eq!(response.text(), "body{}");
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orders"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server, 1024);
        let url = Url::parse(&format!("{}/api/orders", server.uri())).unwrap();
        let response = client.fetch(&Request::get(url)).await.unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_post_body_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/orders"))
            .and(body_string("{\"id\":1}"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let client = client_for(&server, 1024);
        let url = Url::parse(&format!("{}/api/orders", server.uri())).unwrap();
        let request = Request::get(url).with_method("POST").with_body("{\"id\":1}");
        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.status, 201);
    }

    #[tokio::test]
    async fn test_oversize_body_is_network_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/big"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 4096]))
            .mount(&server)
            .await;

        let client = client_for(&server, 1024);
        let url = Url::parse(&format!("{}/big", server.uri())).unwrap();
        let err = client.fetch(&Request::get(url)).await.unwrap_err();
        assert!(matches!(err, Error::FetchTooLarge(_)));
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_failure() {
        let server = MockServer::start().await;
        let client = client_for(&server, 1024);
        let url = Url::parse("http://127.0.0.1:9/unreachable").unwrap();
        let err = client.fetch(&Request::get(url)).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_cross_origin_no_cors_is_opaque_with_status_zero() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/font-awesome/all.min.css"))
            .respond_with(ResponseTemplate::new(404).set_body_raw("missing", "text/plain"))
            .mount(&server)
            .await;

        let mut config = FetchConfig::from_app(&AppConfig::default()).unwrap();
        config.origin = Url::parse("https://app.test").unwrap();
        let client = FetchClient::new(config).unwrap();

        let url = Url::parse(&format!("{}/font-awesome/all.min.css", server.uri())).unwrap();
        let response = client.fetch(&Request::get(url).with_mode(RequestMode::NoCors)).await.unwrap();
        assert_eq!(response.response_type, ResponseType::Opaque);
        assert_eq!(response.status, 0);
        assert_eq!(response.status_text, "");
    }

    #[test]
    fn test_response_type_by_origin_and_mode() {
        let config = FetchConfig::from_app(&AppConfig::default()).unwrap();
        let client = FetchClient::new(config).unwrap();

        let same = Request::get(Url::parse("http://localhost:5000/orders").unwrap());
        assert_eq!(client.response_type(&same), ResponseType::Basic);

        let cdn = Url::parse("https://code.jquery.com/jquery-3.6.0.min.js").unwrap();
        assert_eq!(client.response_type(&Request::get(cdn.clone())), ResponseType::Cors);
        assert_eq!(client.response_type(&Request::get(cdn).with_mode(RequestMode::NoCors)), ResponseType::Opaque);
    }
}
