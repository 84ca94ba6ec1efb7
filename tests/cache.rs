use std::sync::Arc;
use std::time::Duration;

use frond::ast::{Ast, AstKey, Touch};
use frond::cache::{AstCache, MemoryCache, SyncAstCache};
use frond::entity::Entities;
use frond::error::CacheError;
use frond::lexer::collect;
use frond::parser::Parser;

fn compile(name: &str, value: &str) -> Ast {
    let entities = Entities::core();
    let tokens = collect(name, value, &entities).unwrap();
    Parser::new(AstKey::default_scope(name), tokens, &entities)
        .parse()
        .unwrap()
}

#[test]
fn cache_insert_and_retrieve() {
    let cache = MemoryCache::new();
    let ast = compile("doc", "some text");
    assert!(!ast.cached());

    let stored = SyncAstCache::insert(&cache, ast, false).unwrap();
    assert!(stored.cached());
    assert_eq!(1, SyncAstCache::count(&cache));

    let found = SyncAstCache::retrieve(&cache, "doc").unwrap();
    assert!(found.cached());
    assert_eq!(stored.tree(), found.tree());
}

#[test]
fn cache_insert_collision() {
    let cache = MemoryCache::new();
    SyncAstCache::insert(&cache, compile("doc", "one"), false).unwrap();

    let err =
        SyncAstCache::insert(&cache, compile("doc", "two"), false).unwrap_err();
    assert_eq!(CacheError::KeyExists("doc".to_string()), err);

    // replacement is always allowed
    SyncAstCache::insert(&cache, compile("doc", "two"), true).unwrap();
    assert_eq!(1, SyncAstCache::count(&cache));
}

#[test]
fn cache_remove() {
    let cache = MemoryCache::new();
    SyncAstCache::insert(&cache, compile("doc", "text"), false).unwrap();

    assert_eq!(Some(true), SyncAstCache::remove(&cache, "doc"));
    assert_eq!(None, SyncAstCache::retrieve(&cache, "doc"));
    assert_eq!(None, SyncAstCache::remove(&cache, "doc"));
}

#[test]
fn cache_touch_updates_rolling_averages() {
    let cache = MemoryCache::new();
    SyncAstCache::insert(&cache, compile("doc", "text"), false).unwrap();

    SyncAstCache::touch(
        &cache,
        "doc",
        Touch {
            exec: Duration::from_millis(10),
            size: 100,
        },
    );
    SyncAstCache::touch(
        &cache,
        "doc",
        Touch {
            exec: Duration::from_millis(20),
            size: 200,
        },
    );

    let info = SyncAstCache::retrieve(&cache, "doc").unwrap().info().clone();
    assert_eq!(2, info.touches());
    assert_eq!(Duration::from_millis(15), info.exec_avg());
    assert_eq!(150, info.size_avg());
}

#[test]
fn cache_touch_does_not_change_semantics() {
    let cache = MemoryCache::new();
    let stored =
        SyncAstCache::insert(&cache, compile("doc", "text"), false).unwrap();

    SyncAstCache::touch(
        &cache,
        "doc",
        Touch {
            exec: Duration::from_millis(1),
            size: 4,
        },
    );

    let found = SyncAstCache::retrieve(&cache, "doc").unwrap();
    assert_eq!(stored.tree(), found.tree());
    assert!(found.cached());
}

#[test]
fn cache_disabled_behaves_empty() {
    let cache = MemoryCache::new();
    cache.set_enabled(false);

    SyncAstCache::insert(&cache, compile("doc", "text"), false).unwrap();
    assert_eq!(None, SyncAstCache::retrieve(&cache, "doc"));
    assert_eq!(0, SyncAstCache::count(&cache));
    assert_eq!(None, SyncAstCache::remove(&cache, "doc"));

    cache.set_enabled(true);
    assert_eq!(0, SyncAstCache::count(&cache));
}

#[tokio::test]
async fn cache_async_interface_matches_sync() {
    let cache: Arc<dyn AstCache> = Arc::new(MemoryCache::new());
    assert!(cache.sync_interface().is_some());
    assert!(cache.is_enabled());

    cache.insert(compile("doc", "text"), false).await.unwrap();
    assert_eq!(1, cache.count().await);

    let found = cache.retrieve("doc").await.unwrap();
    assert!(found.cached());

    let sync = cache.sync_interface().unwrap();
    assert_eq!(
        sync.retrieve("doc").unwrap().tree(),
        found.tree()
    );

    assert_eq!(Some(true), cache.remove("doc").await);
    assert_eq!(0, cache.count().await);
}
