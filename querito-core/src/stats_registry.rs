use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::CacheStats;

/// Process-wide registry of cache statistics, indexed by cache name.
///
/// Each `ResourceCache` registers its counters on `init` and removes them on
/// `teardown`, so dashboards and diagnostics can inspect caches without holding
/// a handle to them.
///
/// # Examples
///
/// ```
/// use querito_core::{stats_registry, CacheStats};
/// use std::sync::Arc;
///
/// let stats = Arc::new(CacheStats::new());
/// stats_registry::register("doc-example", Arc::clone(&stats));
/// stats.record_hit();
///
/// assert_eq!(stats_registry::get("doc-example").unwrap().hits(), 1);
/// assert!(stats_registry::unregister("doc-example"));
/// ```
static STATS_REGISTRY: Lazy<RwLock<HashMap<String, Arc<CacheStats>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a cache's statistics, replacing any previous registration under `name`.
pub fn register(name: &str, stats: Arc<CacheStats>) {
    STATS_REGISTRY.write().insert(name.to_string(), stats);
}

/// Removes the registration for `name`. Returns false if it was not registered.
pub fn unregister(name: &str) -> bool {
    STATS_REGISTRY.write().remove(name).is_some()
}

/// Returns a cloned snapshot of the statistics registered under `name`.
pub fn get(name: &str) -> Option<CacheStats> {
    STATS_REGISTRY.read().get(name).map(|stats| (**stats).clone())
}

/// Returns the live statistics registered under `name`.
pub fn get_ref(name: &str) -> Option<Arc<CacheStats>> {
    STATS_REGISTRY.read().get(name).cloned()
}

/// Lists all registered cache names, sorted.
pub fn list() -> Vec<String> {
    let mut names: Vec<String> = STATS_REGISTRY.read().keys().cloned().collect();
    names.sort();
    names
}

/// Resets the counters registered under `name`.
pub fn reset(name: &str) -> bool {
    match STATS_REGISTRY.read().get(name) {
        Some(stats) => {
            stats.reset();
            true
        }
        None => false,
    }
}

/// Removes every registration. The statistics themselves are untouched.
pub fn clear() {
    STATS_REGISTRY.write().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_register_and_get() {
        let stats = Arc::new(CacheStats::new());
        register("registry_get", Arc::clone(&stats));
        stats.record_miss();

        let snapshot = get("registry_get").unwrap();
        assert_eq!(snapshot.misses(), 1);

        // Snapshots are detached from the live counters
        stats.record_miss();
        assert_eq!(snapshot.misses(), 1);
        assert_eq!(get_ref("registry_get").unwrap().misses(), 2);
    }

    #[test]
    #[serial]
    fn test_list_and_clear() {
        clear();
        register("b_cache", Arc::new(CacheStats::new()));
        register("a_cache", Arc::new(CacheStats::new()));
        assert_eq!(list(), vec!["a_cache".to_string(), "b_cache".to_string()]);

        clear();
        assert!(list().is_empty());
    }

    #[test]
    #[serial]
    fn test_reset_and_unregister() {
        let stats = Arc::new(CacheStats::new());
        register("registry_reset", Arc::clone(&stats));
        stats.record_hit();

        assert!(reset("registry_reset"));
        assert_eq!(stats.hits(), 0);
        assert!(!reset("nonexistent"));

        assert!(unregister("registry_reset"));
        assert!(!unregister("registry_reset"));
        assert!(get("registry_reset").is_none());
    }
}
