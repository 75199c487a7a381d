//! Cache subsystem.
//!
//! # Data Flow
//! ```text
//! storage client (cache-aside read path)
//!     → CacheStore::get    hit  → return cached payload
//!                          miss → fetch from storage service
//!     → CacheStore::add    (only non-empty results)
//! ```
//!
//! # Design Decisions
//! - Values are opaque JSON payloads; typing happens at the storage client
//! - Expired entries are invisible to readers (lazy expiry); a sweeper is optional
//! - No stampede protection: concurrent misses both fetch, last writer wins

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::queries::Maybe;

pub use memory::InMemoryCache;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors raised by cache backends.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached.
    #[error("cache unavailable: {0}")]
    Unavailable(String),

    /// A stored payload could not be decoded.
    #[error("cache payload error: {0}")]
    Payload(String),
}

/// Key/value store with optional per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a live entry.
    async fn get(&self, key: &str) -> CacheResult<Maybe<Value>>;

    /// Insert or replace an entry. `None` means no expiry.
    async fn add(&self, key: &str, value: Value, expiry: Option<Duration>) -> CacheResult<()>;

    /// Remove an entry if present.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Number of entries currently held, including ones not yet swept.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
