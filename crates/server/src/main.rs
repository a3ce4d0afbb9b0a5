//! dashcache server entry point.
//!
//! Boots the caching engine and serves it as MCP tools on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use dashcache_core::{AppConfig, CacheDb};
use dashcache_engine::{Engine, FetchClient, FetchConfig};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(version = %config.cache.version, db = %config.db_path.display(), "starting dashcache on stdio");

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from_app(&config)?)?;
    let engine = Engine::new(&config, db, Arc::new(network))?;

    if config.auto_install {
        let installed = engine.on_install().await?;
        if !installed.failed.is_empty() {
            tracing::warn!(failed = installed.failed.len(), "some manifest entries were not cached");
        }
        engine.on_activate().await?;
    }

    let handler = handler::DashcacheServer::new(engine);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
