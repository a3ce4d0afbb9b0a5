//! Foreground message channel and the offline orders snapshot.
//!
//! Pages talk to the engine with small JSON messages:
//!
//! - `{"action": "skipWaiting"}`
//! - `{"type": "STORE_OFFLINE_ORDERS", "ordersData": <any JSON>}`
//! - `{"type": "GET_OFFLINE_ORDERS"}`
//!
//! The foreground is the only writer of the snapshot; the engine is its only
//! durable store.

use bytes::Bytes;
use dashcache_core::{CacheDb, Error, GenerationHandle, PutMode, Response, ResponseType};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::background::Background;

/// Any message a page may post to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ClientMessage {
    Action(ActionMessage),
    Data(DataMessage),
}

/// Lifecycle requests, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action")]
pub enum ActionMessage {
    #[serde(rename = "skipWaiting")]
    SkipWaiting,
}

/// Offline-data requests, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataMessage {
    StoreOfflineOrders {
        #[serde(rename = "ordersData", default)]
        orders_data: Value,
    },
    GetOfflineOrders {},
}

impl ClientMessage {
    pub fn skip_waiting() -> Self {
        ClientMessage::Action(ActionMessage::SkipWaiting)
    }

    pub fn store_orders(orders_data: Value) -> Self {
        ClientMessage::Data(DataMessage::StoreOfflineOrders { orders_data })
    }

    pub fn get_orders() -> Self {
        ClientMessage::Data(DataMessage::GetOfflineOrders {})
    }

    /// Decode a raw message posted by a page.
    pub fn parse(raw: Value) -> Result<Self, Error> {
        serde_json::from_value(raw).map_err(|e| Error::InvalidMessage(e.to_string()))
    }
}

/// Reply sent back over a page's reply port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BridgeReply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl BridgeReply {
    pub fn ok(data: Option<Value>) -> Self {
        Self { success: true, data }
    }

    pub fn failed() -> Self {
        Self { success: false, data: None }
    }
}

/// Reads and writes the orders snapshot in the offline-data generation.
#[derive(Debug, Clone)]
pub struct OfflineBridge {
    db: CacheDb,
    generation: GenerationHandle,
    key: String,
    background: Background,
}

impl OfflineBridge {
    pub fn new(db: CacheDb, generation: GenerationHandle, key: String, background: Background) -> Self {
        Self { db, generation, key, background }
    }

    /// The absolute URL the snapshot is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Serialize `payload` and overwrite the snapshot. Returns once the
    /// write is durable.
    pub async fn store(&self, payload: &Value) -> Result<(), Error> {
        let body = Bytes::from(serde_json::to_vec(payload)?);
        let response =
            Response::new(200, "OK", ResponseType::Basic, body).with_header("content-type", "application/json");

        self.db.ensure_generation(&self.generation.name, self.generation.purpose).await?;
        let stored = self.db.put_entry(&self.generation, &self.key, response, PutMode::Strategy).await?;
        if !stored {
            return Err(Error::Serialization("offline snapshot rejected by the cache".into()));
        }
        tracing::debug!(key = %self.key, "stored offline snapshot");
        Ok(())
    }

    /// Store without waiting for the write. Failures are logged.
    pub async fn store_behind(&self, payload: Value) {
        let bridge = self.clone();
        self.background
            .spawn("offline-store", async move {
                if let Err(e) = bridge.store(&payload).await {
                    tracing::warn!(key = %bridge.key, error = %e, "offline snapshot write dropped");
                }
            })
            .await;
    }

    /// Read the snapshot back. Never fails: any problem is `success: false`.
    pub async fn load(&self) -> BridgeReply {
        let stored = match self.db.match_entry(&self.generation, &self.key).await {
            Ok(Some(stored)) => stored,
            Ok(None) => return BridgeReply::failed(),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "offline snapshot lookup failed");
                return BridgeReply::failed();
            }
        };

        match serde_json::from_slice::<Value>(&stored.body) {
            Ok(data) => BridgeReply::ok(Some(data)),
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "offline snapshot is not valid JSON");
                BridgeReply::failed()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashcache_core::Purpose;
    use serde_json::json;

    async fn bridge() -> OfflineBridge {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation =
            GenerationHandle { name: "dashboard-offline-data-v1".into(), purpose: Purpose::OfflineData };
        OfflineBridge::new(db, generation, "http://localhost:5000/offline-data/orders".into(), Background::new())
    }

    #[test]
    fn test_parse_skip_waiting() {
        let msg = ClientMessage::parse(json!({ "action": "skipWaiting" })).unwrap();
        assert_eq!(msg, ClientMessage::skip_waiting());
    }

    #[test]
    fn test_parse_store_orders() {
        let msg = ClientMessage::parse(json!({
            "type": "STORE_OFFLINE_ORDERS",
            "ordersData": [{ "id": 1 }]
        }))
        .unwrap();
        assert_eq!(msg, ClientMessage::store_orders(json!([{ "id": 1 }])));
    }

    #[test]
    fn test_parse_get_orders_ignores_extra_fields() {
        let msg = ClientMessage::parse(json!({ "type": "GET_OFFLINE_ORDERS", "requestId": 3 })).unwrap();
        assert_eq!(msg, ClientMessage::get_orders());
    }

    #[test]
    fn test_parse_rejects_unknown_messages() {
        assert!(matches!(ClientMessage::parse(json!({ "type": "PURGE_ALL" })), Err(Error::InvalidMessage(_))));
        assert!(matches!(ClientMessage::parse(json!({ "action": "reload" })), Err(Error::InvalidMessage(_))));
        assert!(matches!(ClientMessage::parse(json!("skipWaiting")), Err(Error::InvalidMessage(_))));
    }

    #[test]
    fn test_message_wire_names() {
        let value = serde_json::to_value(ClientMessage::store_orders(json!({}))).unwrap();
        assert_eq!(value, json!({ "type": "STORE_OFFLINE_ORDERS", "ordersData": {} }));
        let value = serde_json::to_value(ClientMessage::skip_waiting()).unwrap();
        assert_eq!(value, json!({ "action": "skipWaiting" }));
    }

    #[test]
    fn test_failed_reply_omits_data() {
        let value = serde_json::to_value(BridgeReply::failed()).unwrap();
        assert_eq!(value, json!({ "success": false }));
    }

    #[tokio::test]
    async fn test_load_before_store_fails_softly() {
        let bridge = bridge().await;
        assert_eq!(bridge.load().await, BridgeReply::failed());
    }

    #[tokio::test]
    async fn test_store_then_load_round_trip() {
        let bridge = bridge().await;
        for payload in [json!({}), json!([]), json!({ "orders": [{ "id": 1, "total": 12.5 }] }), json!("text")] {
            bridge.store(&payload).await.unwrap();
            assert_eq!(bridge.load().await, BridgeReply::ok(Some(payload)));
        }
    }

    #[tokio::test]
    async fn test_store_overwrites_wholesale() {
        let bridge = bridge().await;
        bridge.store(&json!({ "a": 1, "b": 2 })).await.unwrap();
        bridge.store(&json!({ "c": 3 })).await.unwrap();
        assert_eq!(bridge.load().await, BridgeReply::ok(Some(json!({ "c": 3 }))));
    }

    #[tokio::test]
    async fn test_store_behind_lands_after_drain() {
        let bridge = bridge().await;
        bridge.store_behind(json!({ "late": true })).await;
        bridge.background.drain().await;
        assert_eq!(bridge.load().await, BridgeReply::ok(Some(json!({ "late": true }))));
    }
}
