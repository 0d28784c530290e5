use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_STALE_AFTER_MS: u64 = 5 * 60 * 1000;
pub const DEFAULT_GC_AFTER_MS: u64 = 30 * 60 * 1000;
pub const DEFAULT_RETRY: u32 = 1;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
pub const DEFAULT_GC_INTERVAL_MS: u64 = 60 * 1000;

/// Cache-wide configuration.
///
/// Deserializable from any serde format, with every field optional:
///
/// ```
/// use querito_core::CacheConfig;
///
/// let config: CacheConfig = serde_json::from_str(r#"{"name": "admin", "retry": 0}"#).unwrap();
/// assert_eq!(config.name, "admin");
/// assert_eq!(config.retry, 0);
/// assert_eq!(config.stale_after_ms, 300_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Name the cache's statistics are registered under.
    pub name: String,
    pub stale_after_ms: u64,
    pub gc_after_ms: u64,
    /// Automatic retries after a failed fetch attempt.
    pub retry: u32,
    pub retry_delay_ms: u64,
    /// Period of the background GC sweep. `None` disables the sweep;
    /// `collect_garbage` can still be called manually.
    pub gc_interval_ms: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            stale_after_ms: DEFAULT_STALE_AFTER_MS,
            gc_after_ms: DEFAULT_GC_AFTER_MS,
            retry: DEFAULT_RETRY,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            gc_interval_ms: Some(DEFAULT_GC_INTERVAL_MS),
        }
    }
}

impl CacheConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after_ms = stale_after.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_gc_after(mut self, gc_after: Duration) -> Self {
        self.gc_after_ms = gc_after.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_gc_interval(mut self, interval: Option<Duration>) -> Self {
        self.gc_interval_ms = interval.map(|d| d.as_millis() as u64);
        self
    }

    pub fn gc_interval(&self) -> Option<Duration> {
        self.gc_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Per-read options. Defaults follow [`CacheConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub stale_after: Duration,
    pub gc_after: Duration,
    /// When false no request is issued and a new entry stays `Idle`.
    pub enabled: bool,
    pub retry: u32,
    pub retry_delay: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl QueryOptions {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            stale_after: Duration::from_millis(config.stale_after_ms),
            gc_after: Duration::from_millis(config.gc_after_ms),
            enabled: true,
            retry: config.retry,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    #[must_use]
    pub fn stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    #[must_use]
    pub fn gc_after(mut self, gc_after: Duration) -> Self {
        self.gc_after = gc_after;
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_platform_policy() {
        let options = QueryOptions::default();
        assert_eq!(options.stale_after, Duration::from_secs(5 * 60));
        assert_eq!(options.gc_after, Duration::from_secs(30 * 60));
        assert_eq!(options.retry, 1);
        assert!(options.enabled);
    }

    #[test]
    fn test_config_builder_feeds_options() {
        let config = CacheConfig::new("admin")
            .with_stale_after(Duration::from_secs(10))
            .with_retry(3)
            .with_gc_interval(None);
        let options = QueryOptions::from_config(&config);
        assert_eq!(options.stale_after, Duration::from_secs(10));
        assert_eq!(options.retry, 3);
        assert_eq!(config.gc_interval(), None);
    }

    #[test]
    fn test_zero_gc_interval_disables_sweep() {
        let config: CacheConfig = serde_json::from_str(r#"{"gc_interval_ms": 0}"#).unwrap();
        assert_eq!(config.gc_interval(), None);

        let config: CacheConfig = serde_json::from_str(r#"{"gc_interval_ms": null}"#).unwrap();
        assert_eq!(config.gc_interval(), None);
    }
}
