use crate::config::QueryOptions;
use crate::error::QueryError;
use crate::normalizer::CacheKey;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fetch status of a cache entry.
///
/// `Idle -> Loading -> {Success, Error}`, and both `Success` and `Error` go back to
/// `Loading` on revalidation. There is no terminal state; entries leave the map
/// through garbage collection only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Point-in-time view of an entry, handed to readers and subscribers.
///
/// While an entry revalidates, `status` is `Loading` and `data` still holds the
/// previous response, so views never flash an empty state.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub status: FetchStatus,
    pub data: Option<Arc<Value>>,
    pub error: Option<QueryError>,
    pub fetched_at: Option<Instant>,
    pub stale_after: Duration,
    pub subscribers: usize,
    pub invalidated: bool,
}

impl CacheEntry {
    /// True once the entry is no longer waiting on a request.
    pub fn is_settled(&self) -> bool {
        self.status != FetchStatus::Loading
    }

    /// True while a refetch runs on top of previously fetched data.
    pub fn is_revalidating(&self) -> bool {
        self.status == FetchStatus::Loading && self.data.is_some()
    }
}

/// Outcome of planning a read against an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDecision {
    /// Serve the current snapshot; nothing to fetch.
    Serve,
    /// A request for this key is already in flight; share it.
    Attach,
    /// Issue a new request (foreground when there is no data yet, background otherwise).
    Fetch,
}

/// Handle for one issued request, identified by the key's generation at issue time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: CacheKey,
    pub generation: u64,
}

/// Outcome of applying a response to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The response belonged to a superseded generation and was dropped.
    Discarded,
}

/// Mutable per-key state owned by the cache map.
///
/// All methods take the current instant explicitly, so every decision is a pure
/// function of the state and the clock reading.
///
/// # Examples
///
/// ```
/// use querito_core::{normalize, EntryState, FetchStatus, ListQuery, QueryOptions, ReadDecision};
/// use serde_json::json;
/// use std::sync::Arc;
/// use std::time::Instant;
///
/// let key = normalize("kanji-list", &ListQuery::new().page(1)).unwrap().cache_key;
/// let now = Instant::now();
/// let mut state = EntryState::new(key, &QueryOptions::default(), now);
///
/// assert_eq!(state.decide(now, true), ReadDecision::Fetch);
/// let ticket = state.begin_fetch();
/// assert_eq!(state.decide(now, true), ReadDecision::Attach);
///
/// state.complete(ticket.generation, Ok(Arc::new(json!([]))), now);
/// assert_eq!(state.snapshot().status, FetchStatus::Success);
/// assert_eq!(state.decide(now, true), ReadDecision::Serve);
/// ```
#[derive(Debug)]
pub struct EntryState {
    key: CacheKey,
    status: FetchStatus,
    data: Option<Arc<Value>>,
    error: Option<QueryError>,
    created_at: Instant,
    fetched_at: Option<Instant>,
    stale_after: Duration,
    gc_after: Duration,
    subscribers: usize,
    invalidated: bool,
    generation: u64,
    in_flight: Option<u64>,
}

impl EntryState {
    /// Creates an `Idle` entry.
    pub fn new(key: CacheKey, options: &QueryOptions, now: Instant) -> Self {
        Self {
            key,
            status: FetchStatus::Idle,
            data: None,
            error: None,
            created_at: now,
            fetched_at: None,
            stale_after: options.stale_after,
            gc_after: options.gc_after,
            subscribers: 0,
            invalidated: false,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn status(&self) -> FetchStatus {
        self.status
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn subscribers(&self) -> usize {
        self.subscribers
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The most recent reader's timing options win.
    pub fn apply_options(&mut self, options: &QueryOptions) {
        self.stale_after = options.stale_after;
        self.gc_after = options.gc_after;
    }

    /// Returns true if the data is older than `stale_after`, or was never fetched.
    pub fn is_stale(&self, now: Instant) -> bool {
        match self.fetched_at {
            Some(at) => now.saturating_duration_since(at) > self.stale_after,
            None => true,
        }
    }

    /// Decides what a newly mounted reader should do.
    ///
    /// A request already in flight is shared unless the entry was invalidated
    /// after that request was issued: its response may predate the mutation, so a
    /// new generation supersedes it.
    pub fn decide(&self, now: Instant, enabled: bool) -> ReadDecision {
        if self.in_flight.is_some() {
            return if enabled && self.invalidated {
                ReadDecision::Fetch
            } else {
                ReadDecision::Attach
            };
        }
        if !enabled {
            return ReadDecision::Serve;
        }
        match self.status {
            FetchStatus::Idle | FetchStatus::Error => ReadDecision::Fetch,
            FetchStatus::Success if self.invalidated || self.is_stale(now) => ReadDecision::Fetch,
            FetchStatus::Success => ReadDecision::Serve,
            // Loading always has an in-flight generation; treat a stray one as shared.
            FetchStatus::Loading => ReadDecision::Attach,
        }
    }

    /// Starts a new generation. Any earlier in-flight generation is superseded.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation = self.generation.wrapping_add(1);
        self.in_flight = Some(self.generation);
        self.status = FetchStatus::Loading;
        self.invalidated = false;
        FetchTicket {
            key: self.key.clone(),
            generation: self.generation,
        }
    }

    /// Returns true if `generation` is the request currently owning the entry.
    pub fn is_current(&self, generation: u64) -> bool {
        self.in_flight == Some(generation)
    }

    /// Applies a response. Responses from superseded generations are discarded.
    ///
    /// Errors keep previously fetched data and leave `fetched_at` untouched.
    pub fn complete(
        &mut self,
        generation: u64,
        outcome: Result<Arc<Value>, QueryError>,
        now: Instant,
    ) -> Completion {
        if !self.is_current(generation) {
            return Completion::Discarded;
        }
        self.in_flight = None;
        match outcome {
            Ok(data) => {
                self.status = FetchStatus::Success;
                self.data = Some(data);
                self.error = None;
                self.fetched_at = Some(now);
            }
            Err(error) => {
                self.status = FetchStatus::Error;
                self.error = Some(error);
            }
        }
        Completion::Applied
    }

    /// Marks the entry stale regardless of its age. Data stays visible.
    pub fn invalidate(&mut self) {
        self.invalidated = true;
    }

    pub fn subscribe(&mut self) {
        self.subscribers = self.subscribers.saturating_add(1);
    }

    /// Decrements the subscriber count. Returns false if it was already zero.
    pub fn unsubscribe(&mut self) -> bool {
        if self.subscribers == 0 {
            return false;
        }
        self.subscribers -= 1;
        true
    }

    /// An entry can be collected once nobody watches it, no request is in
    /// flight, and its last successful fetch (or its creation, if it never
    /// succeeded) is older than `gc_after`.
    pub fn is_collectable(&self, now: Instant) -> bool {
        let since = self.fetched_at.unwrap_or(self.created_at);
        self.subscribers == 0
            && self.in_flight.is_none()
            && now.saturating_duration_since(since) > self.gc_after
    }

    pub fn snapshot(&self) -> CacheEntry {
        CacheEntry {
            key: self.key.clone(),
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            fetched_at: self.fetched_at,
            stale_after: self.stale_after,
            subscribers: self.subscribers,
            invalidated: self.invalidated,
        }
    }
}
