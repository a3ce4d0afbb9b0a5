//! Request classification.
//!
//! Every intercepted GET request lands in exactly one [`Category`], which
//! fixes the strategy used to answer it. Non-GET requests are not
//! classified at all and bypass the engine.

use std::collections::HashSet;

use dashcache_core::{CacheConfig, Error, Request};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::{resolve, same_origin};

/// Request taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Static file or sub-resource listed in the install manifest.
    ShellAsset,
    /// Static file or sub-resource not listed in the manifest.
    StaticResource,
    /// Asset from an allowed CDN host.
    CdnResource,
    /// Read of the locally held orders snapshot.
    OfflineData,
    /// Everything else: API calls and navigations.
    DynamicApi,
}

/// How a category is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    CacheFirst,
    NetworkFirst,
    CacheOnly,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::ShellAsset => "shell-asset",
            Category::StaticResource => "static-resource",
            Category::CdnResource => "cdn-resource",
            Category::OfflineData => "offline-data",
            Category::DynamicApi => "dynamic-api",
        }
    }

    pub fn strategy(self) -> StrategyKind {
        match self {
            Category::ShellAsset | Category::StaticResource | Category::CdnResource => StrategyKind::CacheFirst,
            Category::DynamicApi => StrategyKind::NetworkFirst,
            Category::OfflineData => StrategyKind::CacheOnly,
        }
    }
}

/// Maps requests to categories using the cache configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    static_prefix: String,
    offline_data_prefix: String,
    cdn_hosts: Vec<String>,
    shell_urls: HashSet<String>,
}

impl Classifier {
    /// Build a classifier, resolving every manifest URL against the origin.
    ///
    /// Manifest entries that cannot be resolved are skipped with a warning;
    /// install reports them as failures.
    pub fn new(config: &CacheConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let mut shell_urls = HashSet::new();
        for entry in &config.manifest {
            match resolve(&origin, entry) {
                Ok(url) => {
                    shell_urls.insert(String::from(url));
                }
                Err(e) => tracing::warn!(entry = %entry, error = %e, "skipping unresolvable manifest entry"),
            }
        }

        Ok(Self {
            origin,
            static_prefix: config.static_prefix.clone(),
            offline_data_prefix: config.offline_data_prefix.clone(),
            cdn_hosts: config.allowed_cdn_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            shell_urls,
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Classify a request. Returns `None` for non-GET requests.
    ///
    /// Rules are applied in order and the first match wins:
    /// 1. same-origin path under the offline-data prefix
    /// 2. cross-origin request to an allowed CDN host
    /// 3. path under the static prefix, or a style/script/image/font
    ///    destination: shell asset when listed in the manifest, static
    ///    resource otherwise
    /// 4. anything else, navigations included
    pub fn classify(&self, request: &Request) -> Option<Category> {
        if !request.is_get() {
            return None;
        }

        let url = &request.url;
        let local = same_origin(&self.origin, url);

        if local && url.path().starts_with(&self.offline_data_prefix) {
            return Some(Category::OfflineData);
        }

        if !local
            && let Some(host) = url.host_str()
            && self.cdn_hosts.iter().any(|h| h == host)
        {
            return Some(Category::CdnResource);
        }

        if (local && url.path().starts_with(&self.static_prefix)) || request.destination.is_subresource() {
            if self.shell_urls.contains(&request.cache_key()) {
                return Some(Category::ShellAsset);
            }
            return Some(Category::StaticResource);
        }

        Some(Category::DynamicApi)
    }

    /// Whether a URL is listed in the install manifest.
    pub fn in_manifest(&self, key: &str) -> bool {
        self.shell_urls.contains(key)
    }
}
