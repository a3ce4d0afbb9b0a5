//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (DASHCACHE_*)
//! 2. TOML config file (if DASHCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! Nested cache settings use a double underscore, e.g.
//! `DASHCACHE_CACHE__VERSION=v8`.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::cache::Purpose;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (DASHCACHE_*)
/// 2. TOML file from `DASHCACHE_CONFIG_FILE` (if set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the SQLite database holding every cache generation.
    ///
    /// Set via DASHCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    ///
    /// Set via DASHCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes accepted per network response.
    ///
    /// Set via DASHCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    ///
    /// Set via DASHCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Run install and activate when the server boots.
    ///
    /// Set via DASHCACHE_AUTO_INSTALL environment variable.
    #[serde(default = "default_true")]
    pub auto_install: bool,

    /// Fallback notification title when a push payload has none.
    #[serde(default = "default_notification_title")]
    pub notification_title: String,

    /// Icon attached to every notification.
    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    /// Cache taxonomy and manifest.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Cache names, request routing prefixes and the install manifest.
///
/// Generation names are derived as `<base>-<version>`, so bumping `version`
/// makes every previous generation stale on the next activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Version token appended to every generation name.
    #[serde(default = "default_version")]
    pub version: String,

    /// Origin of the dashboard application (scheme, host, optional port).
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Base name of the shell/static generation.
    #[serde(default = "default_shell_cache")]
    pub shell_cache: String,

    /// Base name of the dynamic (API, navigation) generation.
    #[serde(default = "default_dynamic_cache")]
    pub dynamic_cache: String,

    /// Base name of the offline-data generation.
    #[serde(default = "default_offline_data_cache")]
    pub offline_data_cache: String,

    /// Path prefix of static assets served by the application.
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// Path prefix reserved for offline-data reads.
    #[serde(default = "default_offline_data_prefix")]
    pub offline_data_prefix: String,

    /// Fixed key the orders snapshot is stored under.
    #[serde(default = "default_offline_data_key")]
    pub offline_data_key: String,

    /// Path of the self-contained offline document.
    #[serde(default = "default_offline_page")]
    pub offline_page: String,

    /// URLs fetched and stored at install time, root-relative or absolute.
    ///
    /// The default never lists `/logout`: fetching it at install would end
    /// the session.
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// Cross-origin hosts treated as CDN resources.
    #[serde(default = "default_allowed_cdn_hosts")]
    pub allowed_cdn_hosts: Vec<String>,

    /// Background sync tag that triggers the sync routine.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./dashcache.sqlite")
}

fn default_user_agent() -> String {
    "dashcache/0.1".into()
}

fn default_max_bytes() -> usize {
    10_485_760 // 10MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

fn default_notification_title() -> String {
    "Orders Dashboard".into()
}

fn default_notification_icon() -> String {
    "/static/icons/icon-192x192.png".into()
}

fn default_version() -> String {
    "v1".into()
}

fn default_origin() -> String {
    "http://localhost:5000".into()
}

fn default_shell_cache() -> String {
    "dashboard-shell".into()
}

fn default_dynamic_cache() -> String {
    "dashboard-dynamic".into()
}

fn default_offline_data_cache() -> String {
    "dashboard-offline-data".into()
}

fn default_static_prefix() -> String {
    "/static/".into()
}

fn default_offline_data_prefix() -> String {
    "/offline-data/".into()
}

fn default_offline_data_key() -> String {
    "/offline-data/orders".into()
}

fn default_offline_page() -> String {
    "/offline.html".into()
}

fn default_manifest() -> Vec<String> {
    [
        "/",
        "/orders",
        "/scan_barcode",
        "/manage_employee_status",
        "/manage_note_status",
        "/dashboard",
        "/list_employees",
        "/list_products",
        "/link_store",
        "/offline.html",
        "/static/css/main.css",
        "/static/js/main.js",
        "/static/icons/icon-192x192.png",
        "/static/icons/s.png",
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.rtl.min.css",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css",
        "https://fonts.googleapis.com/css2?family=Tajawal:wght@400;500;700&display=swap",
        "https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js",
        "https://code.jquery.com/jquery-3.6.0.min.js",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_allowed_cdn_hosts() -> Vec<String> {
    ["cdn.jsdelivr.net", "cdnjs.cloudflare.com", "fonts.googleapis.com", "fonts.gstatic.com", "code.jquery.com"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_sync_tag() -> String {
    "sync-orders".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            auto_install: true,
            notification_title: default_notification_title(),
            notification_icon: default_notification_icon(),
            cache: CacheConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            origin: default_origin(),
            shell_cache: default_shell_cache(),
            dynamic_cache: default_dynamic_cache(),
            offline_data_cache: default_offline_data_cache(),
            static_prefix: default_static_prefix(),
            offline_data_prefix: default_offline_data_prefix(),
            offline_data_key: default_offline_data_key(),
            offline_page: default_offline_page(),
            manifest: default_manifest(),
            allowed_cdn_hosts: default_allowed_cdn_hosts(),
            sync_tag: default_sync_tag(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `DASHCACHE_`
    /// 2. TOML file from `DASHCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("DASHCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("DASHCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

impl CacheConfig {
    /// Versioned generation name for a purpose.
    pub fn generation_name(&self, purpose: Purpose) -> String {
        let base = match purpose {
            Purpose::Shell => &self.shell_cache,
            Purpose::Dynamic => &self.dynamic_cache,
            Purpose::OfflineData => &self.offline_data_cache,
        };
        format!("{base}-{}", self.version)
    }

    /// Names of every generation that is current for this version.
    pub fn current_generation_names(&self) -> Vec<String> {
        Purpose::ALL.iter().map(|p| self.generation_name(*p)).collect()
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "cache.origin".into(), reason: e.to_string() })
    }
}
