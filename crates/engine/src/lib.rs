//! Offline caching engine for the orders dashboard.
//!
//! This crate provides:
//! - Request classification and per-category response strategies
//! - The install/activate lifecycle over versioned cache generations
//! - The page-to-engine message bridge for offline order data
//! - Push, notification-click and background-sync hooks
//! - A reqwest-backed [`Network`] implementation

pub mod background;
pub mod bridge;
pub mod classify;
pub mod clients;
pub mod engine;
pub mod fetch;
pub mod hooks;
pub mod lifecycle;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use bridge::{BridgeReply, ClientMessage};
pub use classify::{Category, Classifier, StrategyKind};
pub use clients::ClientInfo;
pub use engine::{Engine, MessageOutcome};
pub use fetch::{FetchClient, FetchConfig, Network};
pub use hooks::{Effect, NoopSync, SyncRoutine};
pub use lifecycle::{ActivateReport, InstallFailure, InstallReport, WorkerState};
pub use strategy::{CurrentGenerations, OFFLINE_MISSING_HEADER};
