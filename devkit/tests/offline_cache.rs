//! Offline asset cache lifecycle against the in-memory origin.

use hazardlite_core::cache::{DiskCacheStorage, DEFAULT_ASSETS, DEFAULT_GENERATION};
use hazardlite_core::{AssetManifest, AssetRequest, CacheError, CachePhase, ResponseSource};
use hazardlite_devkit::{MockOrigin, TestHarness};
use std::sync::Arc;

fn manifest(generation: &str) -> AssetManifest {
    AssetManifest::new(generation, DEFAULT_ASSETS.iter().map(|p| p.to_string()).collect()).unwrap()
}

#[tokio::test]
async fn test_generation_bump_leaves_only_current_bucket() {
    let h = TestHarness::new().with_manifest(manifest("hazardlite-cache-v1"));
    let v1 = h.cache();
    v1.install().await.unwrap();
    v1.activate().await.unwrap();

    let h = h.with_manifest(manifest("hazardlite-cache-v2"));
    let v2 = h.cache();
    assert_eq!(v2.install().await.unwrap(), DEFAULT_ASSETS.len());
    let deleted = v2.activate().await.unwrap();

    assert_eq!(deleted, vec!["hazardlite-cache-v1".to_string()]);
    assert_eq!(h.storage().bucket_names().unwrap(), vec!["hazardlite-cache-v2".to_string()]);
    assert_eq!(v2.phase(), CachePhase::Active);

    // idempotent
    assert!(v2.activate().await.unwrap().is_empty());
    assert_eq!(h.storage().bucket_names().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cached_request_makes_no_network_call() {
    let h = TestHarness::new();
    let cache = h.cache();
    cache.install().await.unwrap();
    cache.activate().await.unwrap();
    assert_eq!(h.origin().fetch_count(), DEFAULT_ASSETS.len());

    h.origin().go_offline();
    for path in DEFAULT_ASSETS {
        let outcome = cache.intercept(&AssetRequest::get(path)).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Cache);
        assert_eq!(outcome.response.body, format!("content of {path}").into_bytes());
    }
    assert_eq!(h.origin().fetch_count(), DEFAULT_ASSETS.len());
}

#[tokio::test]
async fn test_miss_goes_to_network_without_write_back() {
    let h = TestHarness::new().with_origin(MockOrigin::serving_manifest().with_asset("/data/extra.json", "{}"));
    let cache = h.cache();
    cache.install().await.unwrap();

    for _ in 0..2 {
        let outcome = cache.intercept(&AssetRequest::get("/data/extra.json")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
        assert_eq!(outcome.response.status, 200);
    }
    assert_eq!(h.origin().fetches_for("/data/extra.json"), 2);
    assert_eq!(h.storage().lookup(DEFAULT_GENERATION, "/data/extra.json").unwrap(), None);
}

#[tokio::test]
async fn test_offline_miss_propagates_network_error() {
    let h = TestHarness::new();
    let cache = h.cache();
    cache.install().await.unwrap();
    h.origin().go_offline();

    let err = cache.intercept(&AssetRequest::get("/not-cached.js")).await.unwrap_err();
    assert!(matches!(err, CacheError::Network { .. }));
}

#[tokio::test]
async fn test_non_get_bypasses_cache() {
    let h = TestHarness::new();
    let cache = h.cache();
    cache.install().await.unwrap();
    let before = h.origin().fetches_for("/index.html");

    let outcome = cache.intercept(&AssetRequest::new("post", "/index.html")).await.unwrap();
    assert_eq!(outcome.source, ResponseSource::Network);
    assert_eq!(h.origin().fetches_for("/index.html"), before + 1);
}

#[tokio::test]
async fn test_install_is_all_or_nothing() {
    let h = TestHarness::new();
    h.origin().break_path("/main.js");
    let cache = h.cache();

    let err = cache.install().await.unwrap_err();
    assert!(matches!(err, CacheError::Network { ref path, .. } if path == "/main.js"));
    assert_eq!(h.storage().lookup(DEFAULT_GENERATION, "/index.html").unwrap(), None);
    assert_eq!(cache.phase(), CachePhase::Idle);

    let h = TestHarness::new().with_origin(MockOrigin::new().with_asset("/", "home"));
    let err = h.cache().install().await.unwrap_err();
    assert!(matches!(err, CacheError::BadStatus { status: 404, .. }));
    assert_eq!(h.storage().lookup(DEFAULT_GENERATION, "/").unwrap(), None);
}

#[tokio::test]
async fn test_disk_storage_survives_restart() {
    let dir = tempfile::tempdir().unwrap();

    let h = TestHarness::new().with_storage(Arc::new(DiskCacheStorage::new(dir.path()).unwrap()));
    let cache = h.cache();
    cache.install().await.unwrap();
    cache.activate().await.unwrap();

    // fresh storage over the same directory, origin unreachable
    let h = TestHarness::new().with_storage(Arc::new(DiskCacheStorage::new(dir.path()).unwrap()));
    h.origin().go_offline();
    let outcome = h.cache().intercept(&AssetRequest::get("/styles.css")).await.unwrap();

    assert_eq!(outcome.source, ResponseSource::Cache);
    assert_eq!(outcome.response.body, b"content of /styles.css".to_vec());
    assert_eq!(h.origin().fetch_count(), 0);
}

#[tokio::test]
async fn test_upgrade_while_offline_keeps_serving_previous_generation() {
    let h = TestHarness::new().with_manifest(manifest("hazardlite-cache-v1"));
    let v1 = h.cache();
    v1.install().await.unwrap();
    v1.activate().await.unwrap();

    let h = h.with_manifest(manifest("hazardlite-cache-v2"));
    h.origin().go_offline();
    let v2 = h.cache();
    assert!(matches!(v2.install().await, Err(CacheError::Network { .. })));
    assert!(matches!(v2.activate().await, Err(CacheError::NotInstalled(_))));

    assert_eq!(v2.phase(), CachePhase::Idle);
    assert_eq!(h.storage().bucket_names().unwrap(), vec!["hazardlite-cache-v1".to_string()]);

    let fetches = h.origin().fetch_count();
    let outcome = v2.intercept(&AssetRequest::get("/styles.css")).await.unwrap();
    assert_eq!(outcome.source, ResponseSource::Cache);
    assert_eq!(outcome.response.body, b"content of /styles.css".to_vec());
    assert_eq!(h.origin().fetch_count(), fetches);

    // back online: the upgrade completes and the old generation goes
    h.origin().go_online();
    assert_eq!(v2.install().await.unwrap(), DEFAULT_ASSETS.len());
    assert_eq!(v2.activate().await.unwrap(), vec!["hazardlite-cache-v1".to_string()]);
}

#[tokio::test]
async fn test_activate_purges_corrupt_stale_bucket() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hazardlite-cache-v0.json"), "{truncated").unwrap();

    let h = TestHarness::new().with_storage(Arc::new(DiskCacheStorage::new(dir.path()).unwrap()));
    let cache = h.cache();
    cache.install().await.unwrap();
    let deleted = cache.activate().await.unwrap();

    assert_eq!(deleted, vec!["hazardlite-cache-v0".to_string()]);
    assert!(!dir.path().join("hazardlite-cache-v0.json").exists());
    assert_eq!(h.storage().bucket_names().unwrap(), vec![DEFAULT_GENERATION.to_string()]);
}
