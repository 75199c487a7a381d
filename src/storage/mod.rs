//! Storage subsystem: reads against the query-serving services.
//!
//! # Data Flow
//! ```text
//! fetch handler
//!     → StorageClient::get* (optional cache-aside through CacheStore)
//!     → GET {base_url}/{endpoint}[?query]   (failover across base URLs)
//!     → 2xx → Maybe::some(T)   404 → Maybe::none()   other → StorageError
//! ```

pub mod client;
pub mod types;

pub use client::{segment, StorageClient};
pub use types::{StorageError, StorageResult, StorageStream};
