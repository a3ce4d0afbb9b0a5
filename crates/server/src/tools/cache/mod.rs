//! Cache inspection MCP tools.
//!
//! This module provides tools for reading and pruning the generation registry.

pub mod generations;
pub mod get;
pub mod purge;

pub use generations::{CacheKeysParams, generations_impl, keys_impl};
pub use get::{CacheGetParams, get_impl};
pub use purge::{CachePurgeParams, purge_impl};
