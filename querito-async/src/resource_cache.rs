#[cfg(feature = "stats")]
use querito_core::{stats_registry, CacheStats};

use crate::fetcher;
use crate::subscription::Subscription;
use crate::transport::{Transport, TransportRequest};
use dashmap::DashMap;
use parking_lot::Mutex;
use querito_core::{
    normalize_resource, CacheConfig, CacheEntry, CacheKey, Completion, EntryState, FetchStatus,
    FetchTicket, InvalidationRegistry, ListQuery, NormalizedQuery, QueryError, QueryOptions,
    ReadDecision, ResourceDef, Result,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

/// Records a statistic when the `stats` feature is enabled.
macro_rules! stat {
    ($inner:expr, $method:ident $(, $arg:expr)?) => {
        #[cfg(feature = "stats")]
        $inner.stats.$method($($arg)?);
    };
}
pub(crate) use stat;

/// Clock reading used for every staleness and GC decision.
///
/// Goes through tokio's clock so paused-time tests drive it deterministically.
pub(crate) fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// One cached key: its state machine, the request that fills it, and the
/// channel its subscribers watch.
pub(crate) struct Slot {
    pub(crate) state: EntryState,
    pub(crate) request: TransportRequest,
    pub(crate) options: QueryOptions,
    tx: watch::Sender<CacheEntry>,
}

impl Slot {
    fn new(key: CacheKey, request: TransportRequest, options: &QueryOptions, now: Instant) -> Self {
        let state = EntryState::new(key, options, now);
        let (tx, _rx) = watch::channel(state.snapshot());
        Self {
            state,
            request,
            options: options.clone(),
            tx,
        }
    }

    /// Stores the latest snapshot; subscribers are only woken on status, data,
    /// error or invalidation changes.
    pub(crate) fn publish(&self) {
        let next = self.state.snapshot();
        self.tx.send_if_modified(move |current| {
            let notify = current.status != next.status
                || current.invalidated != next.invalidated
                || current.error != next.error
                || !same_data(&current.data, &next.data);
            *current = next;
            notify
        });
    }

    fn receiver(&self) -> watch::Receiver<CacheEntry> {
        self.tx.subscribe()
    }
}

fn same_data(a: &Option<Arc<Value>>, b: &Option<Arc<Value>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mount {
    /// One-shot reader.
    Read,
    /// Reader that stays mounted until its subscription is dropped.
    Subscribe,
    /// Unconditional new generation.
    Refetch,
}

pub(crate) struct Inner {
    pub(crate) entries: DashMap<CacheKey, Slot>,
    pub(crate) transport: Arc<dyn Transport>,
    registry: InvalidationRegistry,
    config: CacheConfig,
    runtime: Handle,
    gc_task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    #[cfg(feature = "stats")]
    pub(crate) stats: Arc<CacheStats>,
}

impl Inner {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(QueryError::Closed)
        } else {
            Ok(())
        }
    }

    /// True while `ticket` still owns its key.
    pub(crate) fn is_current(&self, ticket: &FetchTicket) -> bool {
        self.entries
            .get(&ticket.key)
            .map_or(false, |slot| slot.state.is_current(ticket.generation))
    }

    /// Applies a finished request to its entry, unless it was superseded.
    pub(crate) fn complete(&self, ticket: FetchTicket, outcome: Result<Arc<Value>>) {
        let Some(mut slot) = self.entries.get_mut(&ticket.key) else {
            debug!(key = %ticket.key, generation = ticket.generation, "entry gone before response arrived");
            return;
        };
        let failed = outcome.as_ref().err().cloned();
        match slot.state.complete(ticket.generation, outcome, now()) {
            Completion::Applied => {
                slot.publish();
                if let Some(error) = failed {
                    warn!(key = %ticket.key, generation = ticket.generation, %error, "fetch failed");
                } else {
                    trace!(key = %ticket.key, generation = ticket.generation, "fetch applied");
                }
            }
            Completion::Discarded => {
                stat!(self, record_discarded);
                debug!(
                    key = %ticket.key,
                    generation = ticket.generation,
                    current = slot.state.generation(),
                    "discarding superseded response"
                );
            }
        }
    }

    /// Spawns the fetch driver plus a supervisor that settles the generation
    /// if the driver panics, so the key never stays `Loading` forever.
    fn spawn_fetch(self: &Arc<Self>, ticket: FetchTicket, request: TransportRequest, options: QueryOptions) {
        debug!(key = %ticket.key, generation = ticket.generation, "issuing fetch");
        let driver = self.runtime.spawn(fetcher::run(
            Arc::clone(self),
            ticket.clone(),
            request,
            options,
        ));

        let inner = Arc::clone(self);
        self.runtime.spawn(async move {
            let Err(err) = driver.await else {
                return;
            };
            if err.is_panic() {
                warn!(key = %ticket.key, generation = ticket.generation, "fetch task panicked");
                inner.complete(
                    ticket,
                    Err(QueryError::Network {
                        message: "fetch task panicked".to_string(),
                    }),
                );
            }
        });
    }

    fn collect_garbage(&self) -> usize {
        let now = now();
        let mut removed = 0usize;
        self.entries.retain(|key, slot| {
            if slot.state.is_collectable(now) {
                trace!(%key, "evicting entry");
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            stat!(self, record_evictions, removed as u64);
            debug!(removed, remaining = self.entries.len(), "garbage collected entries");
        }
        removed
    }

    /// Plans a read of `normalized` and issues a fetch if the entry needs one.
    fn mount(
        self: &Arc<Self>,
        resource: &ResourceDef,
        normalized: NormalizedQuery,
        options: &QueryOptions,
        mode: Mount,
    ) -> (CacheEntry, watch::Receiver<CacheEntry>) {
        let now = now();
        let NormalizedQuery { cache_key, wire } = normalized;

        let (snapshot, rx, fetch) = {
            let mut slot = self.entries.entry(cache_key.clone()).or_insert_with(|| {
                Slot::new(
                    cache_key.clone(),
                    TransportRequest::get(resource.path.clone(), wire),
                    options,
                    now,
                )
            });
            slot.state.apply_options(options);
            slot.options = options.clone();
            if mode == Mount::Subscribe {
                slot.state.subscribe();
            }

            let decision = match mode {
                Mount::Refetch => ReadDecision::Fetch,
                Mount::Read | Mount::Subscribe => slot.state.decide(now, options.enabled),
            };
            let fetch = match decision {
                ReadDecision::Serve => {
                    stat!(self, record_hit);
                    trace!(key = %cache_key, status = ?slot.state.status(), "serving cached entry");
                    None
                }
                ReadDecision::Attach => {
                    stat!(self, record_deduplicated);
                    trace!(key = %cache_key, generation = slot.state.generation(), "attaching to in-flight request");
                    None
                }
                ReadDecision::Fetch => {
                    stat!(self, record_miss);
                    let ticket = slot.state.begin_fetch();
                    Some((ticket, slot.request.clone()))
                }
            };
            slot.publish();
            (slot.state.snapshot(), slot.receiver(), fetch)
        };

        if let Some((ticket, request)) = fetch {
            self.spawn_fetch(ticket, request, options.clone());
        }
        (snapshot, rx)
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(task) = self.gc_task.get_mut().take() {
            task.abort();
        }
    }
}

/// Process-wide query cache keyed by normalized list queries.
///
/// Cloning is cheap and yields a handle to the same cache. Construct with
/// [`ResourceCache::init`] inside a tokio runtime and release with
/// [`ResourceCache::teardown`]; tests build isolated instances.
///
/// # Guarantees
///
/// - **Single flight**: at most one request per key is in flight; concurrent
///   readers of the same key share its outcome
/// - **Last issued wins**: a response whose generation was superseded is dropped
/// - **Stale-while-revalidate**: previously fetched data stays visible while a
///   refetch runs, and after a failed one
/// - **Bounded memory**: unwatched entries older than `gc_after` are removed
///
/// # Examples
///
/// ```ignore
/// let cache = ResourceCache::init(CacheConfig::new("admin"), transport, registry)?;
/// let rewards = ResourceDef::new("reward-list", "/reward");
///
/// // Synchronous snapshot; starts a fetch on first use
/// let entry = cache.read(&rewards, &ListQuery::new().page(1), &QueryOptions::default())?;
/// assert_eq!(entry.status, FetchStatus::Loading);
///
/// // Or wait for the data
/// let data = cache.fetch(&rewards, &ListQuery::new().page(1), &QueryOptions::default()).await?;
/// ```
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Inner>,
}

impl ResourceCache {
    /// Creates a cache bound to the current tokio runtime.
    ///
    /// Starts the background GC sweep when `config.gc_interval_ms` is set and
    /// registers statistics under `config.name`.
    ///
    /// # Errors
    ///
    /// [`QueryError::NoRuntime`] when called outside a tokio runtime.
    pub fn init(
        config: CacheConfig,
        transport: Arc<dyn Transport>,
        registry: InvalidationRegistry,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| QueryError::NoRuntime)?;
        let inner = Arc::new(Inner {
            entries: DashMap::new(),
            transport,
            registry,
            config,
            runtime,
            gc_task: Mutex::new(None),
            closed: AtomicBool::new(false),
            #[cfg(feature = "stats")]
            stats: Arc::new(CacheStats::new()),
        });

        #[cfg(feature = "stats")]
        stats_registry::register(&inner.config.name, Arc::clone(&inner.stats));

        if let Some(interval) = inner.config.gc_interval() {
            let weak = Arc::downgrade(&inner);
            let task = inner.runtime.spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                // The first tick completes immediately
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let Some(inner) = weak.upgrade() else {
                        break;
                    };
                    inner.collect_garbage();
                }
            });
            *inner.gc_task.lock() = Some(task);
        }

        debug!(name = %inner.config.name, "resource cache initialized");
        Ok(Self { inner })
    }

    /// Stops the GC sweep, drops every entry and unregisters statistics.
    ///
    /// Pending `fetch` and `settled` calls resolve with [`QueryError::Closed`];
    /// later calls fail the same way. Calling it twice is a no-op.
    pub fn teardown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(task) = self.inner.gc_task.lock().take() {
            task.abort();
        }
        self.inner.entries.clear();

        #[cfg(feature = "stats")]
        {
            let name = &self.inner.config.name;
            if stats_registry::get_ref(name).map_or(false, |s| Arc::ptr_eq(&s, &self.inner.stats)) {
                stats_registry::unregister(name);
            }
        }

        debug!(name = %self.inner.config.name, "resource cache torn down");
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Default per-read options derived from the cache configuration.
    pub fn default_options(&self) -> QueryOptions {
        QueryOptions::from_config(&self.inner.config)
    }

    /// Returns a snapshot of the entry for `resource` + `query`, issuing a fetch
    /// when the entry is missing, failed, stale or invalidated.
    ///
    /// Never waits: a first read returns `Loading` with no data.
    ///
    /// # Errors
    ///
    /// Validation errors from normalization, before the map is touched, and
    /// [`QueryError::Closed`] after teardown.
    pub fn read(
        &self,
        resource: &ResourceDef,
        query: &ListQuery,
        options: &QueryOptions,
    ) -> Result<CacheEntry> {
        let normalized = normalize_resource(resource, query)?;
        self.inner.ensure_open()?;
        let (snapshot, _rx) = self.inner.mount(resource, normalized, options, Mount::Read);
        Ok(snapshot)
    }

    /// Like [`read`](Self::read), but keeps the reader mounted: the entry counts
    /// a subscriber (protecting it from GC) until the returned handle is dropped.
    pub fn subscribe(
        &self,
        resource: &ResourceDef,
        query: &ListQuery,
        options: &QueryOptions,
    ) -> Result<Subscription> {
        let normalized = normalize_resource(resource, query)?;
        self.inner.ensure_open()?;
        let (snapshot, rx) = self
            .inner
            .mount(resource, normalized, options, Mount::Subscribe);
        Ok(Subscription::new(snapshot.key, rx, Arc::downgrade(&self.inner)))
    }

    /// Reads and waits until the entry settles, returning its data or the error
    /// shared by every caller of the same request. Ignores `options.enabled`.
    pub async fn fetch(
        &self,
        resource: &ResourceDef,
        query: &ListQuery,
        options: &QueryOptions,
    ) -> Result<Arc<Value>> {
        let options = options.clone().enabled(true);
        let normalized = normalize_resource(resource, query)?;
        self.inner.ensure_open()?;
        let (_, mut rx) = self.inner.mount(resource, normalized, &options, Mount::Read);
        let entry = {
            let settled = rx
                .wait_for(CacheEntry::is_settled)
                .await
                .map_err(|_| QueryError::Closed)?;
            settled.clone()
        };
        settled_result(entry)
    }

    /// Starts a new generation for the key regardless of freshness. A request
    /// already in flight is superseded and its response will be discarded.
    pub fn refetch(
        &self,
        resource: &ResourceDef,
        query: &ListQuery,
        options: &QueryOptions,
    ) -> Result<CacheEntry> {
        let options = options.clone().enabled(true);
        let normalized = normalize_resource(resource, query)?;
        self.inner.ensure_open()?;
        let (snapshot, _rx) = self
            .inner
            .mount(resource, normalized, &options, Mount::Refetch);
        Ok(snapshot)
    }

    /// Marks every entry whose key starts with `prefix` as stale, keeping its
    /// data visible. Entries with subscribers are revalidated immediately; the
    /// rest refetch on their next read. Returns the number of entries marked.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let mut marked = 0usize;
        let mut refetches = Vec::new();
        for mut slot in self.inner.entries.iter_mut() {
            if !slot.key().matches_prefix(prefix) {
                continue;
            }
            marked += 1;
            slot.state.invalidate();
            if slot.state.subscribers() > 0 && slot.options.enabled {
                stat!(self.inner, record_miss);
                let ticket = slot.state.begin_fetch();
                refetches.push((ticket, slot.request.clone(), slot.options.clone()));
            }
            slot.publish();
        }

        debug!(prefix, marked, revalidating = refetches.len(), "invalidated entries");
        for (ticket, request, options) in refetches {
            self.inner.spawn_fetch(ticket, request, options);
        }
        marked
    }

    /// Sends a mutation straight to the transport (no retry, no caching) and,
    /// on success, invalidates every topic registered for its path.
    pub async fn mutate(&self, request: TransportRequest) -> Result<Value> {
        self.inner.ensure_open()?;
        let topics = self.inner.registry.topics_for(&request.path);
        debug!(method = %request.method, path = %request.path, ?topics, "sending mutation");

        let response = self.inner.transport.request(request).await?;
        let data = response.into_result()?;
        for topic in &topics {
            self.invalidate(topic);
        }
        Ok(data)
    }

    /// Removes entries that have no subscribers, no request in flight, and data
    /// older than their `gc_after`. Returns the number removed.
    pub fn collect_garbage(&self) -> usize {
        self.inner.collect_garbage()
    }

    /// Current snapshot of a key, without mounting a reader.
    pub fn snapshot(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.inner.entries.get(key).map(|slot| slot.state.snapshot())
    }

    /// Cached keys, sorted.
    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.inner.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &CacheStats {
        &self.inner.stats
    }
}

pub(crate) fn settled_result(entry: CacheEntry) -> Result<Arc<Value>> {
    match entry.status {
        FetchStatus::Success => entry.data.ok_or(QueryError::Closed),
        FetchStatus::Error => Err(entry.error.unwrap_or(QueryError::Closed)),
        FetchStatus::Idle | FetchStatus::Loading => Err(QueryError::Closed),
    }
}
