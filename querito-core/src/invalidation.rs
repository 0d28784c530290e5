//! # Cache Invalidation
//!
//! Maps mutation endpoints to the cache topics they make stale.
//!
//! A topic is a resource-name prefix such as `"reward-list"`: invalidating it marks
//! every cached page of the reward list stale, whatever its filters. This registry
//! answers "which topics does a mutation against this path touch?":
//!
//! - **Path registration**: a path prefix maps to one or more topics
//! - **Dependency cascade**: a topic can drag dependent topics along, transitively
//!
//! Registries are plain values owned by whoever wires the cache together; there is
//! no process-wide instance.
//!
//! # Examples
//!
//! ```rust
//! use querito_core::InvalidationRegistry;
//!
//! let registry = InvalidationRegistry::new();
//! registry.register("/gacha-banner", ["gacha-banner-list"]);
//! registry.register_dependency("gacha-banner-list", "reward-list");
//!
//! assert_eq!(
//!     registry.topics_for("/gacha-banner/42"),
//!     vec!["gacha-banner-list".to_string(), "reward-list".to_string()]
//! );
//! assert!(registry.topics_for("/kanji").is_empty());
//! ```

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Registry of mutation paths and topic dependencies.
#[derive(Debug, Default)]
pub struct InvalidationRegistry {
    /// Map from mutation path prefix to the topics it invalidates
    path_to_topics: RwLock<HashMap<String, HashSet<String>>>,
    /// Map from topic to the topics that must be invalidated with it
    topic_dependents: RwLock<HashMap<String, HashSet<String>>>,
}

impl InvalidationRegistry {
    /// Create a new empty invalidation registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the topics invalidated by mutations under `path_prefix`.
    ///
    /// Registering the same prefix again adds to its topic set.
    pub fn register<I, S>(&self, path_prefix: &str, topics: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = self.path_to_topics.write();
        let entry = map.entry(normalize_path(path_prefix)).or_default();
        for topic in topics {
            entry.insert(topic.into());
        }
    }

    /// Register `dependent` to be invalidated whenever `topic` is.
    pub fn register_dependency(&self, topic: &str, dependent: &str) {
        self.topic_dependents
            .write()
            .entry(topic.to_string())
            .or_default()
            .insert(dependent.to_string());
    }

    /// Direct dependents of a topic, sorted.
    pub fn get_dependent_topics(&self, topic: &str) -> Vec<String> {
        let mut dependents: Vec<String> = self
            .topic_dependents
            .read()
            .get(topic)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        dependents.sort();
        dependents
    }

    /// Every topic a mutation against `path` invalidates, dependencies included.
    ///
    /// A prefix matches whole path segments only: `/reward` matches `/reward` and
    /// `/reward/7` but not `/rewards`. Query strings are ignored. Cycles in the
    /// dependency graph are harmless. The result is sorted.
    pub fn topics_for(&self, path: &str) -> Vec<String> {
        let path = normalize_path(path.split('?').next().unwrap_or(path));
        let mut pending: Vec<String> = {
            let map = self.path_to_topics.read();
            map.iter()
                .filter(|(prefix, _)| path_matches(&path, prefix))
                .flat_map(|(_, topics)| topics.iter().cloned())
                .collect()
        };

        let dependents = self.topic_dependents.read();
        let mut seen = BTreeSet::new();
        while let Some(topic) = pending.pop() {
            if !seen.insert(topic.clone()) {
                continue;
            }
            if let Some(next) = dependents.get(&topic) {
                pending.extend(next.iter().filter(|t| !seen.contains(*t)).cloned());
            }
        }
        seen.into_iter().collect()
    }

    /// Clear all registrations
    pub fn clear(&self) {
        self.path_to_topics.write().clear();
        self.topic_dependents.write().clear();
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn path_matches(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix
        || path
            .strip_prefix(prefix)
            .map_or(false, |rest| rest.starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_prefix_matches_whole_segments() {
        let registry = InvalidationRegistry::new();
        registry.register("/reward", ["reward-list"]);

        assert_eq!(registry.topics_for("/reward"), vec!["reward-list"]);
        assert_eq!(registry.topics_for("/reward/12"), vec!["reward-list"]);
        assert_eq!(registry.topics_for("reward/12/"), vec!["reward-list"]);
        assert_eq!(registry.topics_for("/reward?id=3"), vec!["reward-list"]);
        assert!(registry.topics_for("/rewards").is_empty());
    }

    #[test]
    fn test_multiple_prefixes_contribute() {
        let registry = InvalidationRegistry::new();
        registry.register("/question", ["question-list"]);
        registry.register("/question/bulk", ["test-list"]);

        assert_eq!(
            registry.topics_for("/question/bulk"),
            vec!["question-list", "test-list"]
        );
        assert_eq!(registry.topics_for("/question/1"), vec!["question-list"]);
    }

    #[test]
    fn test_dependency_cascade_is_transitive_and_cycle_safe() {
        let registry = InvalidationRegistry::new();
        registry.register("/lesson", ["lesson-list"]);
        registry.register_dependency("lesson-list", "vocabulary-list");
        registry.register_dependency("vocabulary-list", "kanji-list");
        registry.register_dependency("kanji-list", "lesson-list");

        assert_eq!(
            registry.topics_for("/lesson/3"),
            vec!["kanji-list", "lesson-list", "vocabulary-list"]
        );
        assert_eq!(
            registry.get_dependent_topics("lesson-list"),
            vec!["vocabulary-list"]
        );
    }

    #[test]
    fn test_re_register_adds_topics() {
        let registry = InvalidationRegistry::new();
        registry.register("/shop-price", ["shop-price-list"]);
        registry.register("/shop-price", ["daily-quest-list"]);
        assert_eq!(
            registry.topics_for("/shop-price"),
            vec!["daily-quest-list", "shop-price-list"]
        );
    }

    #[test]
    fn test_clear_registry() {
        let registry = InvalidationRegistry::new();
        registry.register("/kanji", ["kanji-list"]);
        registry.register_dependency("kanji-list", "grammar-list");
        registry.clear();
        assert!(registry.topics_for("/kanji").is_empty());
        assert!(registry.get_dependent_topics("kanji-list").is_empty());
    }
}
