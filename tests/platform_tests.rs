//! Integration tests for the platform wiring: catalog, registry and facade.

use async_trait::async_trait;
use parking_lot::Mutex;
use querito::{
    catalog, init_platform_cache, CacheConfig, FetchStatus, FilterValue, ListQuery, QueryOptions,
    SortSpec, Transport, TransportError, TransportRequest, TransportResponse,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Echoes the request back and remembers every request it saw.
#[derive(Default)]
struct EchoTransport {
    seen: Mutex<Vec<TransportRequest>>,
}

#[async_trait]
impl Transport for EchoTransport {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let data = json!({
            "method": request.method.to_string(),
            "path": request.path,
            "query": request.query.to_string(),
        });
        self.seen.lock().push(request);
        Ok(TransportResponse::ok(data))
    }
}

fn config(name: &str) -> CacheConfig {
    CacheConfig::new(name).with_gc_interval(None)
}

#[tokio::test(start_paused = true)]
async fn test_question_mutation_invalidates_test_lists() {
    let transport = Arc::new(EchoTransport::default());
    let cache = init_platform_cache(config("platform_cascade"), transport.clone()).unwrap();
    let options = QueryOptions::default();
    let query = ListQuery::new().page(1).limit(20);

    let questions = cache.read(&catalog::QUESTION, &query, &options).unwrap().key;
    let tests = cache.read(&catalog::TEST, &query, &options).unwrap().key;
    let lessons = cache.read(&catalog::LESSON, &query, &options).unwrap().key;
    tokio::time::sleep(Duration::from_secs(1)).await;

    cache
        .mutate(TransportRequest::put("/question/17", json!({"prompt": "漢字"})))
        .await
        .unwrap();

    assert!(cache.snapshot(&questions).unwrap().invalidated);
    assert!(cache.snapshot(&tests).unwrap().invalidated);
    assert!(!cache.snapshot(&lessons).unwrap().invalidated);
    cache.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_catalog_resources_fetch_their_paths() {
    let transport = Arc::new(EchoTransport::default());
    let cache = init_platform_cache(config("platform_paths"), transport.clone()).unwrap();
    let query = ListQuery::new()
        .filter("status", FilterValue::In(vec!["ACTIVE".into(), "PREVIEW".into()]))
        .filter("title", FilterValue::Like("sakura".into()))
        .filter("name", "x")
        .sort(SortSpec::desc("createdAt"))
        .page(2)
        .limit(20);

    let data = cache
        .fetch(&catalog::GACHA_BANNER, &query, &QueryOptions::default())
        .await
        .unwrap();

    assert_eq!(data["path"], "/gacha-banner");
    assert_eq!(
        data["query"],
        "name=x&qs=status:in=ACTIVE|PREVIEW,title:like=sakura,sort:-createdAt&currentPage=2&pageSize=20"
    );
    cache.teardown();
}

#[tokio::test(start_paused = true)]
async fn test_pokemon_search_is_rewritten() {
    let transport = Arc::new(EchoTransport::default());
    let cache = init_platform_cache(config("platform_search"), transport.clone()).unwrap();
    let query = ListQuery::new().filter("search", "pika").page(1);

    let entry = cache
        .read(&catalog::POKEMON, &query, &QueryOptions::default())
        .unwrap();
    assert_eq!(entry.status, FetchStatus::Loading);
    assert!(entry.key.as_str().starts_with("pokemon-list/"));

    let data = cache
        .fetch(&catalog::POKEMON, &query, &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(data["query"], "qs=name:like=pika&currentPage=1");
    assert_eq!(transport.seen.lock().len(), 1);
    cache.teardown();
}

#[cfg(feature = "stats")]
mod stats {
    use super::*;
    use querito::stats_registry;
    use serial_test::serial;

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn test_teardown_unregisters_only_its_own_stats() {
        let transport = Arc::new(EchoTransport::default());
        let first = init_platform_cache(config("platform_shared_name"), transport.clone()).unwrap();
        let second =
            init_platform_cache(config("platform_shared_name"), transport.clone()).unwrap();

        // The second cache replaced the first in the registry
        first.teardown();
        assert!(stats_registry::get("platform_shared_name").is_some());

        second.teardown();
        assert!(stats_registry::get("platform_shared_name").is_none());
    }

    #[tokio::test(start_paused = true)]
    #[serial]
    async fn test_registry_lists_live_caches() {
        let transport = Arc::new(EchoTransport::default());
        let cache = init_platform_cache(config("platform_listed"), transport).unwrap();
        cache
            .fetch(&catalog::KANJI, &ListQuery::new(), &QueryOptions::default())
            .await
            .unwrap();

        assert!(stats_registry::list().contains(&"platform_listed".to_string()));
        let stats = stats_registry::get("platform_listed").unwrap();
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.fetches(), 1);

        stats_registry::reset("platform_listed");
        assert_eq!(cache.stats().misses(), 0);
        cache.teardown();
    }
}

#[test]
fn test_catalog_lists_every_resource() {
    let names: Vec<&str> = catalog::all().into_iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "pokemon-list",
            "reward-list",
            "gacha-banner-list",
            "grammar-list",
            "kanji-list",
            "lesson-list",
            "vocabulary-list",
            "question-list",
            "test-list",
            "shop-price-list",
            "daily-quest-list",
        ]
    );
}
