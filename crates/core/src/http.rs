//! Request and response values exchanged between pages, the engine and the
//! network.
//!
//! A [`Response`] body is read once. It is deliberately not `Clone`: anything
//! that needs to both return a response and store it must call
//! [`Response::tee`] to get two independent views first.

use std::collections::BTreeMap;

use bytes::Bytes;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Header map with lower-cased names.
pub type Headers = BTreeMap<String, String>;

/// The kind of resource a request is for, as declared by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Top-level or nested navigation.
    Document,
    Style,
    Script,
    Image,
    Font,
    Manifest,
    /// `fetch()`/XHR calls with no declared destination.
    #[default]
    Empty,
}

impl Destination {
    /// Guess a destination from a URL path's extension.
    ///
    /// Paths without a recognised extension are treated as documents, which
    /// is what a bare route like `/orders` is.
    pub fn from_path(path: &str) -> Self {
        let file = path.rsplit('/').next().unwrap_or("");
        let ext = match file.rsplit_once('.') {
            Some((_, ext)) => ext.to_ascii_lowercase(),
            None => return Destination::Document,
        };
        match ext.as_str() {
            "css" => Destination::Style,
            "js" | "mjs" => Destination::Script,
            "png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "ico" => Destination::Image,
            "woff" | "woff2" | "ttf" | "otf" | "eot" => Destination::Font,
            "webmanifest" => Destination::Manifest,
            "html" | "htm" => Destination::Document,
            _ => Destination::Empty,
        }
    }

    /// Whether the destination is one of the sub-resource kinds served
    /// cache-first (style, script, image, font).
    pub fn is_subresource(self) -> bool {
        matches!(self, Destination::Style | Destination::Script | Destination::Image | Destination::Font)
    }
}

/// Request mode, which decides how a cross-origin response is exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    NoCors,
}

/// How much of a response the engine is allowed to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Same-origin response; fully inspectable.
    Basic,
    /// Cross-origin response obtained with CORS.
    Cors,
    /// Cross-origin no-cors response; status cannot be trusted.
    Opaque,
    /// Produced locally by the engine.
    Synthetic,
}

impl ResponseType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseType::Basic => "basic",
            ResponseType::Cors => "cors",
            ResponseType::Opaque => "opaque",
            ResponseType::Synthetic => "synthetic",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "basic" => Some(ResponseType::Basic),
            "cors" => Some(ResponseType::Cors),
            "opaque" => Some(ResponseType::Opaque),
            "synthetic" => Some(ResponseType::Synthetic),
            _ => None,
        }
    }
}

/// Where the engine got a response from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseSource {
    Network,
    Cache,
    OfflinePage,
    OfflineData,
    Synthetic,
}

/// An intercepted request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub url: Url,
    pub destination: Destination,
    pub mode: RequestMode,
    pub headers: Headers,
    pub body: Bytes,
}

impl Request {
    /// A GET request with no declared destination.
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".into(),
            url,
            destination: Destination::Empty,
            mode: RequestMode::Cors,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// A top-level navigation, accepting HTML.
    pub fn navigate(url: Url) -> Self {
        let mut headers = Headers::new();
        headers.insert("accept".into(), "text/html,application/xhtml+xml".into());
        Self {
            method: "GET".into(),
            url,
            destination: Destination::Document,
            mode: RequestMode::Navigate,
            headers,
            body: Bytes::new(),
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into().to_ascii_uppercase();
        self
    }

    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }

    /// Whether the page would render an HTML answer to this request.
    pub fn accepts_html(&self) -> bool {
        self.destination == Destination::Document
            || self.headers.get("accept").is_some_and(|accept| accept.contains("text/html"))
    }

    /// Cache key for this request: the URL without its fragment.
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        url.into()
    }
}

/// A response on its way to a page or into a cache generation.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub response_type: ResponseType,
    pub source: ResponseSource,
    body: Bytes,
}

impl Response {
    pub fn new(
        status: u16, status_text: impl Into<String>, response_type: ResponseType, body: impl Into<Bytes>,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: Headers::new(),
            response_type,
            source: ResponseSource::Network,
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_source(mut self, source: ResponseSource) -> Self {
        self.source = source;
        self
    }

    /// The synthetic unavailability response: 503 with a plain-text body.
    pub fn unavailable() -> Self {
        Response::new(
            503,
            "Service Unavailable",
            ResponseType::Synthetic,
            Bytes::from_static(b"Service unavailable: you are offline and no cached copy exists."),
        )
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_source(ResponseSource::Synthetic)
    }

    /// A JSON response built by the engine.
    pub fn json(status: u16, status_text: &str, value: &serde_json::Value) -> Self {
        Response::new(status, status_text, ResponseType::Synthetic, value.to_string().into_bytes())
            .with_header("content-type", "application/json")
            .with_source(ResponseSource::Synthetic)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Duplicate the response into two independent views.
    ///
    /// The first is meant for the caller, the second for the cache writer.
    pub fn tee(self) -> (Response, Response) {
        let copy = Response {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            response_type: self.response_type,
            source: self.source,
            body: self.body.clone(),
        };
        (self, copy)
    }
}
