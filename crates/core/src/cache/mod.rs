//! SQLite-backed registry of cache generations.
//!
//! Every generation is a named, versioned collection of request → response
//! snapshots. The registry supports:
//!
//! - Idempotent creation of generations per purpose (shell, dynamic, offline data)
//! - Content-addressed entry keys using SHA-256 hashing
//! - Eligibility-checked `put` with last-write-wins overwrite
//! - Lookups in one generation or across all of them
//! - Eviction of every generation outside a keep-set
//! - Automatic schema migrations and WAL mode

pub mod connection;
pub mod entries;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{PutMode, StoredResponse};
pub use generations::{GenerationHandle, GenerationStats, Purpose};
