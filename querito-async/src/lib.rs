//! # Querito Async
//!
//! Runtime half of the Querito list-query cache: a process-wide
//! [`ResourceCache`] that deduplicates concurrent list fetches, serves stale
//! data while revalidating, and invalidates lists after mutations.
//!
//! Entries live in a [DashMap](https://docs.rs/dashmap) keyed by the canonical
//! [`CacheKey`] produced by `querito-core`. Every network request goes through an
//! injected [`Transport`], so the cache itself never performs I/O.
//!
//! ## Features
//!
//! - **Single flight**: one request per key, shared by every concurrent reader
//! - **Stale-while-revalidate**: old data stays visible during a refetch
//! - **Last issued wins**: responses of superseded generations are discarded
//! - **Retry with jitter**: failed fetches are retried `retry` times
//! - **Mutation invalidation**: successful writes invalidate their registered topics
//! - **Garbage collection**: unwatched entries are swept after `gc_after`
//! - **Statistics**: hit/miss/dedup counters via `stats_registry`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use querito_async::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), QueryError> {
//!     let cache = ResourceCache::init(
//!         CacheConfig::new("admin"),
//!         Arc::new(MyHttpClient::new()),
//!         InvalidationRegistry::new(),
//!     )?;
//!
//!     let rewards = ResourceDef::new("reward-list", "/reward");
//!     let query = ListQuery::new().filter("status", "ACTIVE").page(1).limit(20);
//!
//!     // Waits for the first response; later calls are served from memory
//!     let page = cache.fetch(&rewards, &query, &QueryOptions::default()).await?;
//!
//!     // After a write, every cached page of the list is revalidated
//!     cache.mutate(TransportRequest::post("/reward", payload)).await?;
//!     cache.teardown();
//!     Ok(())
//! }
//! ```
//!
//! ## Subscriptions
//!
//! [`ResourceCache::subscribe`] mounts a long-lived reader. Subscribed entries are
//! protected from garbage collection and are refetched as soon as they are
//! invalidated:
//!
//! ```rust,ignore
//! let mut sub = cache.subscribe(&rewards, &query, &QueryOptions::default())?;
//! while let Ok(entry) = sub.changed().await {
//!     render(entry.status, entry.data.as_deref());
//! }
//! ```
mod fetcher;
mod resource_cache;
mod subscription;
mod transport;

pub use resource_cache::ResourceCache;
pub use subscription::Subscription;
pub use transport::{Method, Transport, TransportError, TransportRequest, TransportResponse};

pub use querito_core::{
    CacheConfig, CacheEntry, CacheKey, FetchStatus, FilterSpec, FilterValue, InvalidationRegistry,
    ListQuery, QueryError, QueryOptions, ResourceDef, Result, Scalar, SortDirection, SortSpec,
};

#[cfg(feature = "stats")]
pub use querito_core::{stats_registry, CacheStats};

// Re-export dependencies that callers implementing `Transport` need
pub use async_trait::async_trait;

/// Commonly used items.
pub mod prelude {
    pub use crate::{
        CacheConfig, FetchStatus, FilterValue, InvalidationRegistry, ListQuery, QueryError,
        QueryOptions, ResourceCache, ResourceDef, SortSpec, Subscription, Transport,
        TransportRequest, TransportResponse,
    };

    #[cfg(feature = "stats")]
    pub use crate::{stats_registry, CacheStats};
}
