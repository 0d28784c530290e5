//! Platform resources served by the admin dashboard.
//!
//! Each list resource has a name (the cache key prefix and invalidation topic)
//! and a backend path.

use once_cell::sync::Lazy;
use querito_core::{InvalidationRegistry, ResourceDef};

/// Pokemon list. A `search` filter becomes `name:like`.
pub static POKEMON: Lazy<ResourceDef> =
    Lazy::new(|| ResourceDef::new("pokemon-list", "/pokemon").with_search_field("name"));
pub static REWARD: Lazy<ResourceDef> = Lazy::new(|| ResourceDef::new("reward-list", "/reward"));
pub static GACHA_BANNER: Lazy<ResourceDef> =
    Lazy::new(|| ResourceDef::new("gacha-banner-list", "/gacha-banner"));
pub static GRAMMAR: Lazy<ResourceDef> = Lazy::new(|| ResourceDef::new("grammar-list", "/grammar"));
pub static KANJI: Lazy<ResourceDef> = Lazy::new(|| ResourceDef::new("kanji-list", "/kanji"));
pub static LESSON: Lazy<ResourceDef> = Lazy::new(|| ResourceDef::new("lesson-list", "/lesson"));
pub static VOCABULARY: Lazy<ResourceDef> =
    Lazy::new(|| ResourceDef::new("vocabulary-list", "/vocabulary"));
pub static QUESTION: Lazy<ResourceDef> =
    Lazy::new(|| ResourceDef::new("question-list", "/question"));
pub static TEST: Lazy<ResourceDef> = Lazy::new(|| ResourceDef::new("test-list", "/test"));
pub static SHOP_PRICE: Lazy<ResourceDef> =
    Lazy::new(|| ResourceDef::new("shop-price-list", "/shop-price"));
pub static DAILY_QUEST: Lazy<ResourceDef> =
    Lazy::new(|| ResourceDef::new("daily-quest-list", "/daily-quest"));

/// Every platform resource, in menu order.
pub fn all() -> [&'static ResourceDef; 11] {
    [
        &POKEMON,
        &REWARD,
        &GACHA_BANNER,
        &GRAMMAR,
        &KANJI,
        &LESSON,
        &VOCABULARY,
        &QUESTION,
        &TEST,
        &SHOP_PRICE,
        &DAILY_QUEST,
    ]
}

/// Looks a resource up by its list name.
pub fn find(name: &str) -> Option<&'static ResourceDef> {
    all().into_iter().find(|resource| resource.name == name)
}

/// Registry mapping each resource path to its list topic.
///
/// Tests embed their questions, so question writes also invalidate test lists.
pub fn invalidation_registry() -> InvalidationRegistry {
    let registry = InvalidationRegistry::new();
    for resource in all() {
        registry.register(&resource.path, [resource.name.as_str()]);
    }
    registry.register_dependency(&QUESTION.name, &TEST.name);
    registry
}
