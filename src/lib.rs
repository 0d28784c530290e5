//! # Querito
//!
//! List-query cache for the learning platform's admin dashboard.
//!
//! Querito turns typed list filters into canonical cache keys and backend wire
//! parameters, then caches list responses with single-flight fetching,
//! stale-while-revalidate, and invalidation after mutations.
//!
//! ## Features
//!
//! - **Canonical keys**: insertion order, unset fields and the `"all"` sentinel
//!   never change a cache key
//! - **Filter DSL**: `qs=field:like=v,field:in=a|b,sort:-field` plus bare equality
//!   and `currentPage`/`pageSize`
//! - **Single flight**: concurrent identical reads share one request
//! - **Stale-while-revalidate**: old data stays visible while a refetch runs
//! - **Mutation invalidation**: writes invalidate the lists registered for their path
//! - **Statistics**: per-cache counters through `stats_registry`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use querito::{catalog, CacheConfig, ListQuery, QueryOptions, SortSpec};
//! use std::sync::Arc;
//!
//! let cache = querito::init_platform_cache(CacheConfig::new("admin"), Arc::new(client))?;
//!
//! let query = ListQuery::new()
//!     .filter("search", "pika")
//!     .filter("rarity", "RARE")
//!     .sort(SortSpec::desc("name"))
//!     .page(2)
//!     .limit(20);
//!
//! // GET /pokemon?rarity=RARE&qs=name:like=pika,sort:-name&currentPage=2&pageSize=20
//! let page = cache.fetch(&catalog::POKEMON, &query, &QueryOptions::default()).await?;
//! ```
//!
//! ## Normalizing Without a Cache
//!
//! ```rust
//! use querito::{catalog, normalize_resource, FilterValue, ListQuery};
//!
//! let query = ListQuery::new()
//!     .filter("status", FilterValue::In(vec!["ACTIVE".into(), "PREVIEW".into()]))
//!     .filter("type", "all")
//!     .page(1);
//!
//! let normalized = normalize_resource(&catalog::REWARD, &query).unwrap();
//! assert_eq!(normalized.wire.to_string(), "qs=status:in=ACTIVE|PREVIEW&currentPage=1");
//! ```
//!
//! ## Crates
//!
//! - `querito-core`: filters, normalizer, entry state machine, configuration
//! - `querito-async`: the tokio-based [`ResourceCache`] and [`Transport`] trait
//!
pub mod catalog;

pub use querito_async::{
    async_trait, Method, ResourceCache, Subscription, Transport, TransportError, TransportRequest,
    TransportResponse,
};
pub use querito_core::*;

use std::sync::Arc;

/// Creates a [`ResourceCache`] wired with the platform's invalidation registry.
///
/// # Errors
///
/// [`QueryError::NoRuntime`] when called outside a tokio runtime.
pub fn init_platform_cache(
    config: CacheConfig,
    transport: Arc<dyn Transport>,
) -> Result<ResourceCache> {
    ResourceCache::init(config, transport, catalog::invalidation_registry())
}
