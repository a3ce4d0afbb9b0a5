//! Core types and shared functionality for dashcache.
//!
//! This crate provides:
//! - Cache generation registry with SQLite backend
//! - Request/response values shared by the engine and the server
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, GenerationHandle, GenerationStats, PutMode, Purpose, StoredResponse};
pub use config::{AppConfig, CacheConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Headers, Request, RequestMode, Response, ResponseSource, ResponseType};
