//! Effects produced by lifecycle and platform events, plus the push and
//! background-sync extension points.

use dashcache_core::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Something the host must carry out on the engine's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// The new version does not wait for old pages to close.
    SkipWaiting,
    /// These pages are now served by the engine.
    ClaimClients { client_ids: Vec<String> },
    ShowNotification { title: String, body: String, icon: String },
    CloseNotification,
    FocusClient { client_id: String },
    OpenWindow { url: String, client_id: String },
    SyncCompleted { tag: String },
}

/// Push message payload: `{"title": ..., "body": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl PushPayload {
    /// Decode a raw push body. Text that is not a JSON object becomes the
    /// notification body.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(text) = raw else {
            return Self::default();
        };
        serde_json::from_str(text).unwrap_or_else(|_| Self { title: None, body: Some(text.to_string()) })
    }
}

/// Notification fields used when a push payload leaves them out.
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub title: String,
    pub icon: String,
}

/// Turn a push payload into the notification to show.
pub fn push_effects(payload: PushPayload, defaults: &NotificationDefaults) -> Vec<Effect> {
    vec![Effect::ShowNotification {
        title: payload.title.unwrap_or_else(|| defaults.title.clone()),
        body: payload.body.unwrap_or_default(),
        icon: defaults.icon.clone(),
    }]
}

/// Work run when the background-sync tag fires.
#[async_trait::async_trait]
pub trait SyncRoutine: Send + Sync {
    async fn synchronize(&self, _tag: &str) -> Result<(), Error> {
        Ok(())
    }
}

/// Sync routine that does nothing.
pub struct NoopSync;

impl SyncRoutine for NoopSync {}
