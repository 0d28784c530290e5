//! # Querito Core
//!
//! Core types and pure logic for the Querito list-query cache.
//!
//! This crate holds everything that does not need an async runtime: turning
//! typed filters into canonical cache keys and backend wire parameters, and the
//! per-key entry state machine the resource cache drives.
//!
//! ## Features
//!
//! - **Typed filters**: a tagged union per field (`Eq`, `Like`, `Gte`, `Lte`, `In`)
//! - **Canonical cache keys**: insertion order and unset fields never change a key
//! - **Filter-DSL encoding**: `qs=field:like=v,field:in=a|b,sort:-field` plus
//!   bare equality and pagination parameters
//! - **Entry state machine**: staleness, invalidation, generations and GC eligibility
//! - **Invalidation registry**: mutation paths to topics, with dependency cascade
//! - **Statistics**: hit/miss/dedup/fetch counters and a named registry
//!
//! ## Module Organization
//!
//! - [`filter`] - Filter values and specs
//! - [`normalizer`] - Cache key and wire parameter construction
//! - [`invalidation`] - Mutation path to topic mapping
//! - `cache_entry` - Entry state, snapshots and read decisions
//! - `config` - Cache configuration and per-read options
//!
mod cache_entry;
mod config;
mod error;
mod query;

pub mod filter;
pub mod invalidation;
pub mod normalizer;

#[cfg(feature = "stats")]
mod stats;

#[cfg(feature = "stats")]
pub mod stats_registry;

pub use cache_entry::{CacheEntry, Completion, EntryState, FetchStatus, FetchTicket, ReadDecision};
pub use config::{CacheConfig, QueryOptions};
pub use error::{QueryError, Result};
pub use filter::{FilterSpec, FilterValue, Operator, Scalar, ALL_SENTINEL};
pub use invalidation::InvalidationRegistry;
pub use normalizer::{normalize, normalize_resource, CacheKey, NormalizedQuery, WireParams};
pub use query::{ListQuery, ResourceDef, SortDirection, SortSpec, SEARCH_FIELD};

#[cfg(feature = "stats")]
pub use stats::CacheStats;
