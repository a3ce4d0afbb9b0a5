//! The engine dispatcher.
//!
//! One hook per platform event. Each hook takes the event's inputs and
//! returns what the host should do: a response, a reply, or a list of
//! [`Effect`]s.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashcache_core::{AppConfig, CacheConfig, CacheDb, Error, Request, Response};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};

use crate::background::Background;
use crate::bridge::{ActionMessage, BridgeReply, ClientMessage, DataMessage, OfflineBridge};
use crate::classify::Classifier;
use crate::clients::{ClientInfo, Clients};
use crate::fetch::{Network, resolve};
use crate::hooks::{Effect, NoopSync, NotificationDefaults, PushPayload, SyncRoutine, push_effects};
use crate::lifecycle::{ActivateReport, InstallReport, Lifecycle, WorkerState, bulk_install};
use crate::strategy::{CurrentGenerations, Strategies};

/// What handling a foreground message produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MessageOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<BridgeReply>,
    pub effects: Vec<Effect>,
}

#[derive(Clone)]
pub struct Engine {
    config: CacheConfig,
    db: CacheDb,
    network: Arc<dyn Network>,
    classifier: Arc<Classifier>,
    strategies: Strategies,
    bridge: OfflineBridge,
    lifecycle: Arc<RwLock<Lifecycle>>,
    /// Set by a skipWaiting message; consumed by whichever of install or the
    /// message handler sees `Installed` first.
    skip_waiting: Arc<AtomicBool>,
    clients: Arc<Mutex<Clients>>,
    background: Background,
    notifications: NotificationDefaults,
    sync: Arc<dyn SyncRoutine>,
}

impl Engine {
    /// Build an engine for the configured version. No I/O happens until
    /// [`Engine::on_install`].
    pub fn new(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let cache = config.cache.clone();
        let classifier = Classifier::new(&cache)?;
        let background = Background::new();
        let strategies = Strategies::new(&cache, db.clone(), network.clone(), background.clone())?;

        let offline_key =
            resolve(classifier.origin(), &cache.offline_data_key).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let bridge = OfflineBridge::new(
            db.clone(),
            strategies.generations().offline_data.clone(),
            offline_key.to_string(),
            background.clone(),
        );

        Ok(Self {
            config: cache,
            db,
            network,
            classifier: Arc::new(classifier),
            strategies,
            bridge,
            lifecycle: Arc::new(RwLock::new(Lifecycle::new())),
            skip_waiting: Arc::new(AtomicBool::new(false)),
            clients: Arc::new(Mutex::new(Clients::new())),
            background,
            notifications: NotificationDefaults {
                title: config.notification_title.clone(),
                icon: config.notification_icon.clone(),
            },
            sync: Arc::new(NoopSync),
        })
    }

    /// Replace the background-sync routine.
    pub fn with_sync_routine(mut self, sync: Arc<dyn SyncRoutine>) -> Self {
        self.sync = sync;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn generations(&self) -> &CurrentGenerations {
        self.strategies.generations()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub async fn state(&self) -> WorkerState {
        self.lifecycle.read().await.state()
    }

    /// Wait for every outstanding background write and revalidation.
    pub async fn drain_background(&self) {
        self.background.drain().await;
    }

    pub async fn clients(&self) -> Vec<ClientInfo> {
        self.clients.lock().await.list()
    }

    /// Register an open page. Pages opened after activation are controlled
    /// from the start.
    pub async fn open_client(&self, url: &str) -> Result<ClientInfo, Error> {
        let url = resolve(self.classifier.origin(), url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let controlled = self.state().await.controls_fetches();
        Ok(self.clients.lock().await.open(url.as_str(), controlled))
    }

    pub async fn close_client(&self, id: &str) -> bool {
        self.clients.lock().await.close(id)
    }

    /// Populate the current generations from the manifest.
    ///
    /// Individual asset failures are reported, not returned as errors. An
    /// error means the registry itself failed and the engine is redundant.
    ///
    /// A skipWaiting message received before install finished activates the
    /// engine straight away.
    ///
    /// The state is checked under the read lock first, so a refused install
    /// never queues behind in-flight fetches.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        self.state().await.check_install()?;
        self.lifecycle.write().await.begin_install()?;

        let generations = self.generations();
        if let Err(e) = generations.ensure_all(&self.db).await {
            tracing::error!(error = %e, "install failed to open generations");
            self.lifecycle.write().await.fail_install();
            return Err(e);
        }

        let (cached, failed) = bulk_install(
            &self.db,
            &self.network,
            self.classifier.origin(),
            &self.config.manifest,
            &generations.shell,
        )
        .await;

        self.lifecycle.write().await.finish_install();

        tracing::info!(
            version = %self.config.version,
            cached = cached.len(),
            failed = failed.len(),
            "install complete"
        );

        let mut effects = vec![Effect::SkipWaiting];
        if self.skip_waiting.swap(false, Ordering::SeqCst) {
            tracing::info!("skip-waiting requested during install; activating");
            match self.on_activate().await {
                Ok(report) => effects.extend(report.effects),
                Err(e) => tracing::warn!(error = %e, "skip-waiting activation failed"),
            }
        }

        Ok(InstallReport {
            version: self.config.version.clone(),
            generation: generations.shell.name.clone(),
            cached,
            failed,
            effects,
        })
    }

    /// Evict other versions' generations and claim open pages.
    ///
    /// Holds the lifecycle write lock throughout, so no request is answered
    /// while generations are being deleted. The write lock is only requested
    /// once the engine is `Installed`; in that state no fetch holds the read
    /// lock across a network call.
    pub async fn on_activate(&self) -> Result<ActivateReport, Error> {
        self.state().await.check_activate()?;
        let mut lifecycle = self.lifecycle.write().await;
        lifecycle.begin_activate()?;

        let evicted = match self.db.evict_except(&self.generations().names()).await {
            Ok(evicted) => evicted,
            Err(e) => {
                tracing::error!(error = %e, "eviction failed; staying installed");
                lifecycle.abort_activate();
                return Err(e);
            }
        };

        let claimed = self.clients.lock().await.claim();
        lifecycle.finish_activate();

        tracing::info!(
            version = %self.config.version,
            evicted = ?evicted,
            claimed = claimed.len(),
            "activated"
        );

        Ok(ActivateReport {
            version: self.config.version.clone(),
            evicted,
            claimed: claimed.clone(),
            effects: vec![Effect::ClaimClients { client_ids: claimed }],
        })
    }

    /// Answer an intercepted request.
    ///
    /// Controlled GET requests always produce a response. `Err` is only
    /// possible for requests the engine does not handle (non-GET, or any
    /// request before activation) whose network fetch failed.
    pub async fn on_fetch(&self, request: Request) -> Result<Response, Error> {
        let lifecycle = self.lifecycle.read().await;

        if !lifecycle.state().controls_fetches() {
            drop(lifecycle);
            tracing::debug!(url = %request.url, "not controlling yet; passing through");
            return self.network.fetch(&request).await;
        }

        let Some(category) = self.classifier.classify(&request) else {
            drop(lifecycle);
            tracing::debug!(url = %request.url, method = %request.method, "bypassing non-GET request");
            return self.network.fetch(&request).await;
        };

        let response = self.strategies.respond(category, request).await;
        drop(lifecycle);
        Ok(response)
    }

    /// Handle a message posted by a page. `reply_requested` is true when the
    /// page supplied a reply port.
    pub async fn on_message(&self, message: ClientMessage, reply_requested: bool) -> MessageOutcome {
        match message {
            ClientMessage::Action(ActionMessage::SkipWaiting) => {
                let effects = self.skip_waiting().await;
                MessageOutcome { reply: reply_requested.then(|| BridgeReply::ok(None)), effects }
            }
            ClientMessage::Data(DataMessage::StoreOfflineOrders { orders_data }) => {
                if !reply_requested {
                    self.bridge.store_behind(orders_data).await;
                    return MessageOutcome { reply: None, effects: Vec::new() };
                }
                let reply = match self.bridge.store(&orders_data).await {
                    Ok(()) => BridgeReply::ok(None),
                    Err(e) => {
                        tracing::warn!(error = %e, "offline snapshot write failed");
                        BridgeReply::failed()
                    }
                };
                MessageOutcome { reply: Some(reply), effects: Vec::new() }
            }
            ClientMessage::Data(DataMessage::GetOfflineOrders {}) => {
                MessageOutcome { reply: Some(self.bridge.load().await), effects: Vec::new() }
            }
        }
    }

    /// Leave the waiting state now instead of when old pages close.
    ///
    /// Before install finishes the request is remembered and
    /// [`Engine::on_install`] acts on it.
    async fn skip_waiting(&self) -> Vec<Effect> {
        self.skip_waiting.store(true, Ordering::SeqCst);

        let mut effects = vec![Effect::SkipWaiting];
        match self.state().await {
            WorkerState::Parsed | WorkerState::Installing => {}
            WorkerState::Installed => {
                if self.skip_waiting.swap(false, Ordering::SeqCst) {
                    match self.on_activate().await {
                        Ok(report) => effects.extend(report.effects),
                        Err(e) => tracing::warn!(error = %e, "skip-waiting activation failed"),
                    }
                }
            }
            WorkerState::Activating | WorkerState::Activated | WorkerState::Redundant => {
                self.skip_waiting.store(false, Ordering::SeqCst);
            }
        }
        effects
    }

    /// A push message arrived.
    pub async fn on_push(&self, payload: Option<&str>) -> Vec<Effect> {
        tracing::debug!(has_payload = payload.is_some(), "push received");
        push_effects(PushPayload::parse(payload), &self.notifications)
    }

    /// A notification was clicked: focus the app root or open it.
    pub async fn on_notification_click(&self) -> Vec<Effect> {
        let root = match self.classifier.origin().join("/") {
            Ok(url) => String::from(url),
            Err(_) => self.config.origin.clone(),
        };
        let controlled = self.state().await.controls_fetches();

        let mut clients = self.clients.lock().await;
        let focus = match clients.find_by_url(&root) {
            Some(existing) => {
                let client_id = existing.id.clone();
                clients.focus(&client_id);
                Effect::FocusClient { client_id }
            }
            None => {
                let opened = clients.open(&root, controlled);
                clients.focus(&opened.id);
                Effect::OpenWindow { url: root, client_id: opened.id }
            }
        };
        vec![Effect::CloseNotification, focus]
    }

    /// A background-sync event fired. Unknown tags are ignored.
    pub async fn on_sync(&self, tag: &str) -> Result<Vec<Effect>, Error> {
        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring unknown sync tag");
            return Ok(Vec::new());
        }
        self.sync.synchronize(tag).await?;
        tracing::info!(tag, "background sync complete");
        Ok(vec![Effect::SyncCompleted { tag: tag.to_string() }])
    }
}
