use std::sync::atomic::{AtomicU64, Ordering};

/// Resource cache statistics.
///
/// Tracks how reads were served and what the fetch pipeline did, using atomic
/// counters with `Relaxed` ordering: each counter is independent and only ever
/// read as an approximate snapshot.
///
/// * `hits` - reads served from the map without issuing a request
/// * `misses` - reads that issued a request
/// * `deduplicated` - reads that attached to a request already in flight
/// * `fetches` - transport calls, retries included
/// * `retries` - automatic retries after a failed attempt
/// * `discarded` - responses dropped because a newer generation superseded them
/// * `evictions` - entries removed by garbage collection
///
/// # Examples
///
/// ```
/// use querito_core::CacheStats;
///
/// let stats = CacheStats::new();
///
/// stats.record_hit();
/// stats.record_hit();
/// stats.record_miss();
/// stats.record_deduplicated();
///
/// assert_eq!(stats.hits(), 2);
/// assert_eq!(stats.total_reads(), 4);
/// // hits and deduplicated reads both avoided a request
/// assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
/// ```
#[derive(Debug)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    deduplicated: AtomicU64,
    fetches: AtomicU64,
    retries: AtomicU64,
    discarded: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    /// Creates a new `CacheStats` instance with zero counters.
    pub fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            deduplicated: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_deduplicated(&self) {
        self.deduplicated.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_discarded(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn deduplicated(&self) -> u64 {
        self.deduplicated.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn retries(&self) -> u64 {
        self.retries.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn discarded(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Total reads: hits + misses + deduplicated.
    #[inline]
    pub fn total_reads(&self) -> u64 {
        self.hits() + self.misses() + self.deduplicated()
    }

    /// Fraction of reads that did not issue a new request (hits and
    /// deduplicated reads). Returns 0.0 when there were no reads.
    ///
    /// # Examples
    ///
    /// ```
    /// use querito_core::CacheStats;
    ///
    /// let stats = CacheStats::new();
    /// assert_eq!(stats.hit_rate(), 0.0);
    ///
    /// stats.record_miss();
    /// stats.record_deduplicated();
    /// assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    /// ```
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        let total = self.total_reads();
        if total == 0 {
            0.0
        } else {
            (self.hits() + self.deduplicated()) as f64 / total as f64
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        for counter in [
            &self.hits,
            &self.misses,
            &self.deduplicated,
            &self.fetches,
            &self.retries,
            &self.discarded,
            &self.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            hits: AtomicU64::new(self.hits()),
            misses: AtomicU64::new(self.misses()),
            deduplicated: AtomicU64::new(self.deduplicated()),
            fetches: AtomicU64::new(self.fetches()),
            retries: AtomicU64::new(self.retries()),
            discarded: AtomicU64::new(self.discarded()),
            evictions: AtomicU64::new(self.evictions()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats() {
        let stats = CacheStats::new();
        assert_eq!(stats.total_reads(), 0);
        assert_eq!(stats.fetches(), 0);
        assert_eq!(stats.evictions(), 0);
    }

    #[test]
    fn test_fetch_pipeline_counters() {
        let stats = CacheStats::new();
        stats.record_fetch();
        stats.record_fetch();
        stats.record_retry();
        stats.record_discarded();
        stats.record_evictions(3);
        assert_eq!(stats.fetches(), 2);
        assert_eq!(stats.retries(), 1);
        assert_eq!(stats.discarded(), 1);
        assert_eq!(stats.evictions(), 3);
    }

    #[test]
    fn test_reset() {
        let stats = CacheStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_fetch();
        stats.record_evictions(2);

        stats.reset();
        assert_eq!(stats.total_reads(), 0);
        assert_eq!(stats.fetches(), 0);
        assert_eq!(stats.evictions(), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let stats = CacheStats::new();
        stats.record_hit();

        let cloned = stats.clone();
        stats.record_hit();
        assert_eq!(stats.hits(), 2);
        assert_eq!(cloned.hits(), 1);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(CacheStats::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let stats_clone = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    stats_clone.record_hit();
                }
                for _ in 0..50 {
                    stats_clone.record_miss();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stats.hits(), 1000);
        assert_eq!(stats.misses(), 500);
        assert!((stats.hit_rate() - 0.6666).abs() < 0.001);
    }
}
