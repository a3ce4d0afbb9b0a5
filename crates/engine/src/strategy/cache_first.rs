//! Cache-first with background revalidation (stale-while-revalidate).

use dashcache_core::{PutMode, Request, Response};

use super::Strategies;
use crate::classify::Category;

impl Strategies {
    /// Serve from the shell generation when possible and refresh it behind
    /// the caller's back; go to the network only on a miss.
    pub(super) async fn cache_first(&self, category: Category, request: Request) -> Response {
        let key = request.cache_key();

        if let Some(cached) = self.lookup(&self.generations.shell, &key).await {
            tracing::debug!(key = %key, category = category.as_str(), "cache hit");
            self.revalidate_behind(request, key).await;
            return cached;
        }

        tracing::debug!(key = %key, category = category.as_str(), "cache miss");
        match self.network.fetch(&request).await {
            Ok(response) if PutMode::Strategy.accepts(&response) => {
                let (caller, copy) = response.tee();
                self.store_behind(self.generations.shell.clone(), key, copy).await;
                caller
            }
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(key = %key, error = %e, "network failed with no cached copy");
                self.cache_first_fallback(category, &request).await
            }
        }
    }

    async fn cache_first_fallback(&self, category: Category, request: &Request) -> Response {
        if category == Category::CdnResource || request.accepts_html() {
            self.offline_page_or_unavailable().await
        } else {
            Response::unavailable()
        }
    }

    /// Fetch `request` again in the background and overwrite the shell entry.
    async fn revalidate_behind(&self, request: Request, key: String) {
        let network = self.network.clone();
        let db = self.db.clone();
        let generation = self.generations.shell.clone();

        self.background
            .spawn("revalidate", async move {
                let response = match network.fetch(&request).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::debug!(key = %key, error = %e, "revalidation fetch failed");
                        return;
                    }
                };
                match db.put_entry(&generation, &key, response, PutMode::Strategy).await {
                    Ok(true) => tracing::debug!(key = %key, "revalidated"),
                    Ok(false) => {}
                    Err(e) => tracing::warn!(key = %key, error = %e, "revalidation write dropped"),
                }
            })
            .await;
    }
}
