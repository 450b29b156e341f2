//! Unit tests for the record cache

use super::*;
use std::sync::atomic::AtomicUsize;

use cxinfo_core::error::ExtensionInfoError;
use cxinfo_core::types::ListingAttributes;

const ID_A: &str = "aapbdbdomjkkjkaonfhkkikfgjllcleb";
const ID_B: &str = "eimadpbcbfnmbkopoojfekhnkhdbieeh";
const ID_C: &str = "cjpalhdlnbpafiamejdnhcphjbkeiagm";

fn id(raw: &str) -> ExtensionId {
    ExtensionId::parse(raw).unwrap()
}

fn create_test_record(raw: &str, name: &str) -> ExtensionRecord {
    ExtensionRecord::new(
        raw,
        ListingAttributes {
            name: Some(name.to_string()),
            ..ListingAttributes::default()
        },
    )
    .unwrap()
}

#[test]
fn test_cache_entry_freshness() {
    let entry = CacheEntry::new(create_test_record(ID_A, "A"), 0);

    assert!(entry.is_fresh(None));
    assert!(entry.is_fresh(Some(Duration::from_secs(3600))));
    assert!(!entry.is_fresh(Some(Duration::ZERO)));
}

#[test]
fn test_cache_entry_age() {
    let entry = CacheEntry::new(create_test_record(ID_A, "A"), 0);

    let age = entry.age();
    assert!(age.is_some());
    assert!(age.unwrap() < Duration::from_secs(5));
}

#[test]
fn test_store_and_lookup() {
    let cache = ExtensionCache::new();
    assert!(cache.is_empty());
    assert!(cache.lookup(&id(ID_A)).is_none());

    cache.store(create_test_record(ID_A, "A"));

    let cached = cache.lookup(&id(ID_A)).unwrap();
    assert_eq!(cached.name(), Some("A"));
    assert!(cache.contains(&id(ID_A)));
    assert!(!cache.contains(&id(ID_B)));
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_store_replaces_entry() {
    let cache = ExtensionCache::new();
    cache.store(create_test_record(ID_A, "old"));
    cache.store(create_test_record(ID_A, "new"));

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.lookup(&id(ID_A)).unwrap().name(), Some("new"));
}

#[tokio::test]
async fn test_get_or_fetch_fetches_once() {
    let cache = ExtensionCache::new();
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let calls = Arc::clone(&calls);
        let record = cache
            .get_or_fetch(&id(ID_A), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(create_test_record(ID_A, "A"))
            })
            .await
            .unwrap();
        assert_eq!(record.name(), Some("A"));
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let cache = ExtensionCache::new();

    let result = cache
        .get_or_fetch(&id(ID_A), || async {
            Err(ExtensionInfoError::network_message("connection reset"))
        })
        .await;
    assert!(result.unwrap_err().is_network());
    assert!(cache.is_empty());
    assert!(cache.slots.is_empty());

    let record = cache
        .get_or_fetch(&id(ID_A), || async { Ok(create_test_record(ID_A, "A")) })
        .await
        .unwrap();
    assert_eq!(record.name(), Some("A"));
}

#[tokio::test]
async fn test_concurrent_fetches_are_coalesced() {
    let cache = Arc::new(ExtensionCache::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_fetch(&id(ID_A), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(create_test_record(ID_A, "A"))
                    })
                    .await
            })
        })
        .collect();

    for task in tasks {
        let record = task.await.unwrap().unwrap();
        assert_eq!(record.id().as_str(), ID_A);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_callers_share_a_failure() {
    let cache = Arc::new(ExtensionCache::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                cache
                    .get_or_fetch(&id(ID_A), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Err(ExtensionInfoError::NotFound { id: ID_A.to_string() })
                    })
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().unwrap_err().is_not_found());
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.slots.is_empty());
}

#[tokio::test]
async fn test_failed_lookups_leave_no_slots_behind() {
    let cache = ExtensionCache::with_policy(CacheConfig {
        ttl_secs: None,
        max_entries: Some(1),
    });

    for raw in [ID_A, ID_B, ID_C] {
        let result = cache
            .get_or_fetch(&id(raw), || async {
                Err(ExtensionInfoError::network_message("connection reset"))
            })
            .await;
        assert!(result.is_err());
    }

    assert_eq!(cache.slots.len(), 0);
    assert_eq!(cache.in_flight(), 0);
}

#[tokio::test]
async fn test_abandoned_fetch_is_dropped() {
    let cache = ExtensionCache::new();

    let cancelled = tokio::time::timeout(
        Duration::from_millis(20),
        cache.get_or_fetch(&id(ID_A), || async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(create_test_record(ID_A, "stalled"))
        }),
    )
    .await;
    assert!(cancelled.is_err());
    assert_eq!(cache.in_flight(), 0);

    let record = cache
        .get_or_fetch(&id(ID_A), || async { Ok(create_test_record(ID_A, "fresh")) })
        .await
        .unwrap();
    assert_eq!(record.name(), Some("fresh"));
}

#[tokio::test]
async fn test_clear_during_fetch_discards_result() {
    let cache = Arc::new(ExtensionCache::new());

    let pending = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move {
            cache
                .get_or_fetch(&id(ID_A), || async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(create_test_record(ID_A, "A"))
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(cache.in_flight(), 1);
    cache.clear();

    let record = pending.await.unwrap().unwrap();
    assert_eq!(record.name(), Some("A"));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_zero_ttl_refetches() {
    let cache = ExtensionCache::with_policy(CacheConfig {
        ttl_secs: Some(0),
        max_entries: None,
    });
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..2 {
        let calls = Arc::clone(&calls);
        cache
            .get_or_fetch(&id(ID_A), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(create_test_record(ID_A, "A"))
            })
            .await
            .unwrap();
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.lookup(&id(ID_A)).is_none());
}

#[test]
fn test_capacity_evicts_oldest() {
    let cache = ExtensionCache::with_policy(CacheConfig {
        ttl_secs: None,
        max_entries: Some(2),
    });

    cache.store(create_test_record(ID_A, "A"));
    cache.store(create_test_record(ID_B, "B"));
    cache.store(create_test_record(ID_C, "C"));

    assert_eq!(cache.len(), 2);
    assert!(!cache.contains(&id(ID_A)));
    assert!(cache.contains(&id(ID_B)));
    assert!(cache.contains(&id(ID_C)));
}

#[test]
fn test_stats_and_cleanup() {
    let cache = ExtensionCache::with_policy(CacheConfig {
        ttl_secs: Some(0),
        max_entries: None,
    });
    cache.store(create_test_record(ID_A, "A"));
    cache.store(create_test_record(ID_B, "B"));

    let stats = cache.stats();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.fresh_entries, 0);
    assert_eq!(stats.stale_entries, 2);

    assert_eq!(cache.cleanup(), 2);
    assert!(cache.is_empty());
}

#[test]
fn test_clear() {
    let cache = ExtensionCache::new();
    cache.store(create_test_record(ID_A, "A"));
    cache.store(create_test_record(ID_B, "B"));

    let stats = cache.stats();
    assert_eq!(stats.fresh_entries, 2);
    assert_eq!(stats.stale_entries, 0);

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.stats().total_entries, 0);
}
