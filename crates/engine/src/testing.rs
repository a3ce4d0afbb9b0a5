//! Test doubles: a scripted network and an engine harness.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashcache_core::{AppConfig, CacheConfig, CacheDb, Error, Request, RequestMode, Response, ResponseType};
use tokio::sync::Notify;
use url::Url;

use crate::engine::Engine;
use crate::fetch::{Network, same_origin};

pub(crate) const ORIGIN: &str = "https://app.test";

struct Route {
    status: u16,
    bodies: VecDeque<String>,
}

/// In-memory network answering from a route table keyed by absolute URL.
pub(crate) struct ScriptedNetwork {
    origin: Url,
    routes: Mutex<HashMap<String, Route>>,
    failing: Mutex<HashSet<String>>,
    held: Mutex<HashMap<String, Arc<Notify>>>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

fn absolute(url: &str) -> String {
    if url.starts_with('/') { format!("{ORIGIN}{url}") } else { url.to_string() }
}

impl ScriptedNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            origin: Url::parse(ORIGIN).unwrap(),
            routes: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            held: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Answer `url` (absolute, or root-relative to the test origin).
    pub(crate) fn respond(&self, url: &str, status: u16, body: &str) {
        self.respond_each(url, status, &[body]);
    }

    /// Answer successive calls with successive bodies; the last one repeats.
    pub(crate) fn respond_each(&self, url: &str, status: u16, bodies: &[&str]) {
        let key = absolute(url);
        self.failing.lock().unwrap().remove(&key);
        let bodies = bodies.iter().map(|b| b.to_string()).collect();
        self.routes.lock().unwrap().insert(key, Route { status, bodies });
    }

    /// Make `url` fail as if the connection was refused.
    pub(crate) fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(absolute(url));
    }

    /// Park every fetch of `url` until the returned gate is notified.
    pub(crate) fn hold(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.held.lock().unwrap().insert(absolute(url), gate.clone());
        gate
    }

    pub(crate) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        let key = absolute(url);
        self.calls.lock().unwrap().iter().filter(|c| **c == key).count()
    }
}

#[async_trait::async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let key = request.cache_key();
        self.calls.lock().unwrap().push(key.clone());
        let gate = self.held.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        tokio::task::yield_now().await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        if self.failing.lock().unwrap().contains(&key) {
            return Err(Error::Network(format!("connection refused: {key}")));
        }

        let (status, body) = {
            let mut routes = self.routes.lock().unwrap();
            let route = routes.get_mut(&key).ok_or_else(|| Error::Network(format!("no route to {key}")))?;
            let body = if route.bodies.len() > 1 {
                route.bodies.pop_front().unwrap_or_default()
            } else {
                route.bodies.front().cloned().unwrap_or_default()
            };
            (route.status, body)
        };

        let response_type = if same_origin(&self.origin, &request.url) {
            ResponseType::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseType::Opaque
        } else {
            ResponseType::Cors
        };
        let status = if response_type == ResponseType::Opaque { 0 } else { status };
        let content_type = if key.ends_with(".html") { "text/html" } else { "text/plain" };

        Ok(Response::new(status, "", response_type, body.into_bytes()).with_header("content-type", content_type))
    }
}

/// An engine wired to a scripted network and an in-memory database.
pub(crate) struct Harness {
    pub engine: Engine,
    pub network: Arc<ScriptedNetwork>,
    pub db: CacheDb,
    pub config: AppConfig,
}

impl Harness {
    pub const OFFLINE_PAGE: &'static str = "<html><body>You are offline</body></html>";

    /// Fresh engine whose manifest is `manifest`. `/offline.html` is routed.
    pub async fn new(manifest: &[&str]) -> Self {
        let cache = CacheConfig {
            origin: ORIGIN.into(),
            manifest: manifest.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        };
        let config = AppConfig { cache, ..Default::default() };
        let network = ScriptedNetwork::new();
        network.respond("/offline.html", 200, Self::OFFLINE_PAGE);
        let db = CacheDb::open_in_memory().await.unwrap();
        let engine = Engine::new(&config, db.clone(), network.clone()).unwrap();
        Self { engine, network, db, config }
    }

    /// A second engine on the same database and network, as after a restart
    /// or a version bump.
    pub fn restart(&self, config: AppConfig) -> Self {
        let engine = Engine::new(&config, self.db.clone(), self.network.clone()).unwrap();
        Self { engine, network: self.network.clone(), db: self.db.clone(), config }
    }

    pub async fn install_and_activate(&self) {
        self.engine.on_install().await.unwrap();
        self.engine.on_activate().await.unwrap();
    }

    pub fn url(&self, path: &str) -> String {
        absolute(path)
    }

    pub fn get(&self, path: &str) -> Request {
        Request::get(Url::parse(&absolute(path)).unwrap())
    }

    pub fn navigate(&self, path: &str) -> Request {
        Request::navigate(Url::parse(&absolute(path)).unwrap())
    }

    pub fn absolute(&self, url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    /// Fetch through the engine; controlled requests never fail.
    pub async fn fetch(&self, request: Request) -> Response {
        self.engine.on_fetch(request).await.unwrap()
    }
}
