//! Network-first with cache fallback, for API calls and navigations.

use dashcache_core::{PutMode, Request, Response};

use super::Strategies;

impl Strategies {
    /// Prefer the live response and keep a copy in the dynamic generation.
    ///
    /// When the network fails the dynamic generation is consulted first,
    /// then the shell generation (pages pre-cached at install), then the
    /// offline page.
    pub(super) async fn network_first(&self, request: Request) -> Response {
        let key = request.cache_key();

        let err = match self.network.fetch(&request).await {
            Ok(response) if PutMode::Strategy.accepts(&response) => {
                let (caller, copy) = response.tee();
                self.store_behind(self.generations.dynamic.clone(), key, copy).await;
                return caller;
            }
            Ok(response) => return response,
            Err(e) => e,
        };

        tracing::debug!(key = %key, error = %err, "network failed, falling back to cache");

        if let Some(cached) = self.lookup(&self.generations.dynamic, &key).await {
            return cached;
        }
        if let Some(cached) = self.lookup(&self.generations.shell, &key).await {
            return cached;
        }
        self.offline_page_or_unavailable().await
    }
}
