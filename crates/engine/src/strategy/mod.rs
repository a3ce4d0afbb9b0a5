//! Per-category response strategies.
//!
//! | Category                      | Strategy                         | Last resort           |
//! |-------------------------------|----------------------------------|-----------------------|
//! | shell asset, static resource  | cache-first, revalidate behind   | offline page for HTML, else 503 |
//! | CDN resource                  | cache-first, revalidate behind   | offline page, else 503 |
//! | dynamic API, navigation       | network-first, copy into dynamic | offline page, else 503 |
//! | offline data                  | cache-only                       | structured "missing"  |
//!
//! Strategies never return an error: every path ends in a response. Cache
//! writes run as detached background tasks and their failures are logged.

mod cache_first;
mod network_first;
mod offline_data;

pub use offline_data::OFFLINE_MISSING_HEADER;

use std::sync::Arc;

use dashcache_core::{
    CacheConfig, CacheDb, Error, GenerationHandle, PutMode, Purpose, Request, Response, ResponseSource,
    StoredResponse,
};

use crate::background::Background;
use crate::classify::Category;
use crate::fetch::{Network, resolve};

/// Handles of the generations that are current for the running version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentGenerations {
    pub shell: GenerationHandle,
    pub dynamic: GenerationHandle,
    pub offline_data: GenerationHandle,
}

impl CurrentGenerations {
    pub fn from_config(config: &CacheConfig) -> Self {
        let handle = |purpose| GenerationHandle { name: config.generation_name(purpose), purpose };
        Self {
            shell: handle(Purpose::Shell),
            dynamic: handle(Purpose::Dynamic),
            offline_data: handle(Purpose::OfflineData),
        }
    }

    /// Create every current generation that does not exist yet.
    pub async fn ensure_all(&self, db: &CacheDb) -> Result<(), Error> {
        for handle in [&self.shell, &self.dynamic, &self.offline_data] {
            db.ensure_generation(&handle.name, handle.purpose).await?;
        }
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        vec![self.shell.name.clone(), self.dynamic.name.clone(), self.offline_data.name.clone()]
    }
}

/// Executes the strategy matching a request's category.
#[derive(Clone)]
pub struct Strategies {
    db: CacheDb,
    network: Arc<dyn Network>,
    generations: CurrentGenerations,
    background: Background,
    offline_page_key: String,
}

impl Strategies {
    pub fn new(
        config: &CacheConfig, db: CacheDb, network: Arc<dyn Network>, background: Background,
    ) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let offline_page_key = resolve(&origin, &config.offline_page)
            .map_err(|e| Error::InvalidUrl(e.to_string()))?
            .to_string();

        Ok(Self { db, network, generations: CurrentGenerations::from_config(config), background, offline_page_key })
    }

    pub fn generations(&self) -> &CurrentGenerations {
        &self.generations
    }

    /// Answer a classified request.
    pub async fn respond(&self, category: Category, request: Request) -> Response {
        tracing::debug!(
            url = %request.url,
            category = category.as_str(),
            strategy = ?category.strategy(),
            "handling request"
        );
        match category {
            Category::ShellAsset | Category::StaticResource | Category::CdnResource => {
                self.cache_first(category, request).await
            }
            Category::DynamicApi => self.network_first(request).await,
            Category::OfflineData => self.offline_data(&request).await,
        }
    }

    /// Look a key up in one generation, treating registry failures as misses.
    async fn lookup(&self, generation: &GenerationHandle, key: &str) -> Option<Response> {
        match self.db.match_entry(generation, key).await {
            Ok(found) => found.map(StoredResponse::into_response),
            Err(e) => {
                tracing::warn!(generation = %generation.name, key, error = %e, "cache lookup failed");
                None
            }
        }
    }

    /// The cached offline document, if install stored it.
    async fn offline_page(&self) -> Option<Response> {
        self.lookup(&self.generations.shell, &self.offline_page_key)
            .await
            .map(|page| page.with_source(ResponseSource::OfflinePage))
    }

    /// Offline page when available, otherwise the synthetic 503.
    async fn offline_page_or_unavailable(&self) -> Response {
        match self.offline_page().await {
            Some(page) => page,
            None => Response::unavailable(),
        }
    }

    /// Write a response copy into `generation` without blocking the caller.
    async fn store_behind(&self, generation: GenerationHandle, key: String, response: Response) {
        let db = self.db.clone();
        self.background
            .spawn("cache-put", async move {
                match db.put_entry(&generation, &key, response, PutMode::Strategy).await {
                    Ok(true) => tracing::debug!(generation = %generation.name, key = %key, "cached response"),
                    Ok(false) => {}
                    Err(e) => {
                        tracing::warn!(generation = %generation.name, key = %key, error = %e, "cache write dropped")
                    }
                }
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_generations_follow_version() {
        let config = CacheConfig { version: "v9".into(), ..Default::default() };
        let current = CurrentGenerations::from_config(&config);
        assert_eq!(current.shell.name, "dashboard-shell-v9");
        assert_eq!(current.dynamic.purpose, Purpose::Dynamic);
        assert_eq!(current.names(), config.current_generation_names());
    }

    #[tokio::test]
    async fn test_ensure_all_creates_three_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let current = CurrentGenerations::from_config(&CacheConfig::default());
        current.ensure_all(&db).await.unwrap();
        current.ensure_all(&db).await.unwrap();

        let mut names = db.generation_names().await.unwrap();
        names.sort();
        let mut expected = current.names();
        expected.sort();
        assert_eq!(names, expected);
    }
}
