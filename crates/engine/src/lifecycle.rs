//! Worker lifecycle: install, wait, activate.
//!
//! ```text
//! Parsed ──install──▶ Installing ──▶ Installed ──activate──▶ Activating ──▶ Activated
//!                         │              ▲                        │
//!                         ▼              └────── eviction failed ─┘
//!                     Redundant
//! ```
//!
//! Only an `Activated` engine answers intercepted requests. Install always
//! asks to skip waiting, so a host may activate as soon as install returns.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use dashcache_core::{CacheDb, Destination, Error, GenerationHandle, PutMode, Request, RequestMode};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use url::Url;

use crate::fetch::{Network, resolve, same_origin};
use crate::hooks::Effect;

/// Manifest fetches in flight at once during install.
pub const INSTALL_CONCURRENCY: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Activated,
    /// Install failed; this engine will never control pages.
    Redundant,
}

impl WorkerState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        }
    }

    /// Whether requests are routed through the strategies.
    pub fn controls_fetches(self) -> bool {
        self == WorkerState::Activated
    }

    /// Install may start from here.
    pub fn check_install(self) -> Result<(), Error> {
        match self {
            WorkerState::Parsed | WorkerState::Installed => Ok(()),
            other => Err(Error::Lifecycle(format!("cannot install from state {}", other.as_str()))),
        }
    }

    /// Activation may start from here.
    pub fn check_activate(self) -> Result<(), Error> {
        match self {
            WorkerState::Installed => Ok(()),
            other => Err(Error::Lifecycle(format!("cannot activate from state {}", other.as_str()))),
        }
    }
}

/// Lifecycle state plus the skip-waiting flag.
#[derive(Debug)]
pub struct Lifecycle {
    state: WorkerState,
    changed_at: Instant,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self { state: WorkerState::Parsed, changed_at: Instant::now() }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Enter `Installing`. Allowed from `Parsed` and, for a repeated install
    /// of the same version, from `Installed`.
    pub fn begin_install(&mut self) -> Result<(), Error> {
        self.state.check_install()?;
        self.set(WorkerState::Installing);
        Ok(())
    }

    pub fn finish_install(&mut self) {
        self.set(WorkerState::Installed);
    }

    pub fn fail_install(&mut self) {
        self.set(WorkerState::Redundant);
    }

    /// Enter `Activating`. Only an installed engine can activate.
    pub fn begin_activate(&mut self) -> Result<(), Error> {
        self.state.check_activate()?;
        self.set(WorkerState::Activating);
        Ok(())
    }

    pub fn finish_activate(&mut self) {
        self.set(WorkerState::Activated);
    }

    /// Eviction failed: go back to waiting so activation can be retried.
    pub fn abort_activate(&mut self) {
        self.set(WorkerState::Installed);
    }

    fn set(&mut self, next: WorkerState) {
        tracing::info!(
            from = self.state.as_str(),
            to = next.as_str(),
            after_ms = self.changed_at.elapsed().as_millis() as u64,
            "lifecycle transition"
        );
        self.state = next;
        self.changed_at = Instant::now();
    }
}

/// One manifest entry that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallFailure {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InstallReport {
    pub version: String,
    pub generation: String,
    /// Stored URLs, sorted.
    pub cached: Vec<String>,
    pub failed: Vec<InstallFailure>,
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivateReport {
    pub version: String,
    /// Generations deleted because they belong to another version.
    pub evicted: Vec<String>,
    pub claimed: Vec<String>,
    pub effects: Vec<Effect>,
}

/// Request used to fetch a manifest entry.
///
/// Same-origin entries are plain same-origin GETs. Cross-origin entries go
/// out as no-cors, so their responses come back opaque.
fn manifest_request(origin: &Url, url: Url) -> Request {
    let destination = Destination::from_path(url.path());
    let mode = if same_origin(origin, &url) { RequestMode::SameOrigin } else { RequestMode::NoCors };
    Request::get(url).with_destination(destination).with_mode(mode)
}

/// Fetch every manifest entry and store the successes in `shell`.
///
/// A failing entry is logged and reported, never fatal. Duplicate entries
/// are fetched once.
pub async fn bulk_install(
    db: &CacheDb, network: &Arc<dyn Network>, origin: &Url, manifest: &[String], shell: &GenerationHandle,
) -> (Vec<String>, Vec<InstallFailure>) {
    let semaphore = Arc::new(Semaphore::new(INSTALL_CONCURRENCY));
    let mut failed = Vec::new();
    let mut seen = HashSet::new();
    let mut join_set = JoinSet::new();

    for entry in manifest {
        let url = match resolve(origin, entry) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(entry = %entry, error = %e, "skipping manifest entry");
                failed.push(InstallFailure { url: entry.clone(), reason: e.to_string() });
                continue;
            }
        };
        let key = url.to_string();
        if !seen.insert(key.clone()) {
            continue;
        }

        let request = manifest_request(origin, url);
        let network = network.clone();
        let db = db.clone();
        let shell = shell.clone();
        let semaphore = semaphore.clone();

        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            let outcome = match network.fetch(&request).await {
                Ok(response) => {
                    let status = response.status;
                    match db.put_entry(&shell, &key, response, PutMode::BulkInstall).await {
                        Ok(true) => Ok(()),
                        Ok(false) => Err(format!("not cacheable (status {status})")),
                        Err(e) => Err(e.to_string()),
                    }
                }
                Err(e) => Err(e.to_string()),
            };
            (key, outcome)
        });
    }

    let mut cached = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((key, Ok(()))) => cached.push(key),
            Ok((key, Err(reason))) => {
                tracing::warn!(url = %key, reason = %reason, "install asset skipped");
                failed.push(InstallFailure { url: key, reason });
            }
            Err(e) => tracing::warn!(error = %e, "install task did not complete"),
        }
    }

    cached.sort();
    failed.sort_by(|a, b| a.url.cmp(&b.url));
    (cached, failed)
}
