//! Cache-only reads of the offline-data generation.

use dashcache_core::{Request, Response, ResponseSource};
use serde_json::json;

use super::Strategies;

/// Header marking the structured "nothing stored" answer.
pub const OFFLINE_MISSING_HEADER: &str = "x-dashcache-offline";

impl Strategies {
    /// Never touches the network. A miss is a 404 JSON body carrying
    /// [`OFFLINE_MISSING_HEADER`], so callers can tell it apart from a
    /// network error.
    pub(super) async fn offline_data(&self, request: &Request) -> Response {
        let key = request.cache_key();
        match self.lookup(&self.generations.offline_data, &key).await {
            Some(stored) => stored.with_source(ResponseSource::OfflineData),
            None => {
                tracing::debug!(key = %key, "no offline data stored");
                Response::json(404, "Not Found", &json!({ "success": false, "error": "no offline data" }))
                    .with_header(OFFLINE_MISSING_HEADER, "missing")
                    .with_source(ResponseSource::OfflineData)
            }
        }
    }
}
