//! Offline asset cache - versioned, cache-first shell for the web client
//!
//! Lifecycle over one cache generation (a named bucket):
//! - install   : fetch every manifest asset, then store them all in the
//!   generation's bucket. All-or-nothing: one failed or non-2xx fetch fails
//!   the install and nothing is written.
//! - activate  : delete every bucket whose name is not the current generation.
//!   Refused until install succeeded. Running it again without a new
//!   generation changes nothing.
//! - intercept : cache-first. A hit is served without touching the network.
//!   Until the current generation is installed, earlier generations still
//!   answer.
//!   A miss goes to the network and the response is passed through without
//!   being stored. If the network fails on a miss the error reaches the
//!   caller; there is no offline fallback page.
//!
//! Storage and network are collaborators behind [`CacheStorage`] and
//! [`AssetFetcher`] so both can be swapped (memory / disk, HTTP / directory).

pub mod disk;
pub mod memory;
pub mod origin;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;
pub use origin::{DirectoryOrigin, HttpOrigin};

use futures::future::{try_join_all, BoxFuture};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

pub const DEFAULT_GENERATION: &str = "hazardlite-cache-v1";

pub const DEFAULT_ASSETS: [&str; 7] = [
    "/",
    "/index.html",
    "/styles.css",
    "/main.js",
    "/manifest.webmanifest",
    "/icons/icon-192.png",
    "/icons/icon-512.png",
];

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("network error fetching {path}: {reason}")]
    Network { path: String, reason: String },
    #[error("{path} answered with status {status}")]
    BadStatus { path: String, status: u16 },
    #[error("invalid manifest: {0}")]
    InvalidManifest(String),
    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),
    #[error("generation {0} is not installed, refusing to activate")]
    NotInstalled(String),
    #[error("invalid request path: {0}")]
    InvalidPath(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fixed asset list paired with the generation identifier naming its bucket.
///
/// The generation must be bumped whenever the asset list or the assets
/// themselves change; that is what lets `activate` find stale buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetManifest {
    generation: String,
    assets: Vec<String>,
}

impl AssetManifest {
    pub fn new(generation: impl Into<String>, assets: Vec<String>) -> Result<Self, CacheError> {
        let generation = generation.into();
        validate_bucket_name(&generation)
            .map_err(|_| CacheError::InvalidManifest(format!("bad generation '{generation}'")))?;

        let mut seen = HashSet::new();
        for path in &assets {
            if !path.starts_with('/') {
                return Err(CacheError::InvalidManifest(format!("asset path '{path}' must start with '/'")));
            }
            if !seen.insert(path.as_str()) {
                return Err(CacheError::InvalidManifest(format!("duplicate asset path '{path}'")));
            }
        }
        Ok(Self { generation, assets })
    }

    pub fn generation(&self) -> &str {
        &self.generation
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            generation: DEFAULT_GENERATION.to_string(),
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Outgoing resource request. The path (with its query string, if any) is
/// the cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub method: String,
    pub path: String,
}

impl AssetRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self { method: method.into().to_ascii_uppercase(), path: path.into() }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn cache_key(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    #[serde(with = "time::serde::rfc3339")]
    pub stored_at: OffsetDateTime,
}

impl CachedResponse {
    pub fn new(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self { status, content_type, body, stored_at: OffsetDateTime::now_utc() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Bucketed response storage keyed by (bucket name, request key).
pub trait CacheStorage: Send + Sync {
    /// Creates the bucket if it does not exist yet.
    fn open(&self, bucket: &str) -> Result<(), CacheError>;
    fn put_all(&self, bucket: &str, entries: Vec<(String, CachedResponse)>) -> Result<(), CacheError>;
    fn lookup(&self, bucket: &str, key: &str) -> Result<Option<CachedResponse>, CacheError>;
    fn bucket_names(&self) -> Result<Vec<String>, CacheError>;
    /// Returns whether a bucket was actually removed.
    fn delete_bucket(&self, bucket: &str) -> Result<bool, CacheError>;
}

/// Network side of the cache. Non-2xx answers are returned as responses;
/// only transport failures are errors.
pub trait AssetFetcher: Send + Sync {
    fn fetch<'a>(&'a self, request: &'a AssetRequest) -> BoxFuture<'a, Result<CachedResponse, CacheError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePhase {
    Idle,
    Installed,
    Active,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptOutcome {
    pub response: CachedResponse,
    pub source: ResponseSource,
}

pub struct OfflineAssetCache {
    manifest: AssetManifest,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn AssetFetcher>,
    phase: Mutex<CachePhase>,
}

impl OfflineAssetCache {
    pub fn new(manifest: AssetManifest, storage: Arc<dyn CacheStorage>, fetcher: Arc<dyn AssetFetcher>) -> Self {
        Self { manifest, storage, fetcher, phase: Mutex::new(CachePhase::Idle) }
    }

    pub fn manifest(&self) -> &AssetManifest {
        &self.manifest
    }

    pub fn phase(&self) -> CachePhase {
        *self.phase.lock()
    }

    /// Populates the current generation's bucket. Returns the number of
    /// assets stored.
    pub async fn install(&self) -> Result<usize, CacheError> {
        let generation = self.manifest.generation();

        let fetches = self.manifest.assets().iter().map(|path| async move {
            let request = AssetRequest::get(path.clone());
            let response = self.fetcher.fetch(&request).await?;
            if !response.is_success() {
                return Err(CacheError::BadStatus { path: path.clone(), status: response.status });
            }
            Ok((path.clone(), response))
        });

        let entries = try_join_all(fetches).await.map_err(|e| {
            error!(generation, error = %e, "cache install failed, nothing stored");
            e
        })?;

        let count = entries.len();
        self.storage.open(generation)?;
        self.storage.put_all(generation, entries)?;
        *self.phase.lock() = CachePhase::Installed;
        info!(generation, assets = count, "cache installed");
        Ok(count)
    }

    /// Purges every bucket from other generations. Returns the deleted names.
    ///
    /// Only an installed generation can be activated; until then the older
    /// buckets stay in place and keep answering `intercept`.
    pub async fn activate(&self) -> Result<Vec<String>, CacheError> {
        let generation = self.manifest.generation();
        if self.phase() == CachePhase::Idle {
            warn!(generation, "activation skipped, generation not installed");
            return Err(CacheError::NotInstalled(generation.to_string()));
        }
        let mut deleted = Vec::new();

        for name in self.storage.bucket_names()? {
            if name != generation && self.storage.delete_bucket(&name)? {
                info!(bucket = %name, "stale cache bucket deleted");
                deleted.push(name);
            }
        }

        *self.phase.lock() = CachePhase::Active;
        Ok(deleted)
    }

    pub async fn intercept(&self, request: &AssetRequest) -> Result<InterceptOutcome, CacheError> {
        if request.is_get() {
            match self.lookup(request.cache_key()) {
                Ok(Some(response)) => {
                    return Ok(InterceptOutcome { response, source: ResponseSource::Cache });
                }
                Ok(None) => {}
                Err(e) => warn!(path = %request.path, error = %e, "cache lookup failed, using network"),
            }
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => Ok(InterceptOutcome { response, source: ResponseSource::Network }),
            Err(e) => {
                warn!(path = %request.path, error = %e, "network fetch failed and no cached copy");
                Err(e)
            }
        }
    }

    /// Current generation first. While it is not installed, the buckets of
    /// earlier generations are still live and are searched too.
    fn lookup(&self, key: &str) -> Result<Option<CachedResponse>, CacheError> {
        let generation = self.manifest.generation();
        if let Some(hit) = self.storage.lookup(generation, key)? {
            return Ok(Some(hit));
        }
        if self.phase() != CachePhase::Idle {
            return Ok(None);
        }
        for bucket in self.storage.bucket_names()? {
            if bucket == generation {
                continue;
            }
            if let Some(hit) = self.storage.lookup(&bucket, key)? {
                debug!(%bucket, key, "served from previous generation");
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }
}

pub(crate) fn validate_bucket_name(name: &str) -> Result<(), CacheError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidBucketName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TableOrigin {
        files: HashMap<String, Vec<u8>>,
        offline: bool,
        calls: AtomicUsize,
    }

    impl TableOrigin {
        fn with_assets(paths: &[&str]) -> Self {
            let files = paths.iter().map(|p| (p.to_string(), p.as_bytes().to_vec())).collect();
            Self { files, ..Default::default() }
        }
    }

    impl AssetFetcher for TableOrigin {
        fn fetch<'a>(&'a self, request: &'a AssetRequest) -> BoxFuture<'a, Result<CachedResponse, CacheError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if self.offline {
                    return Err(CacheError::Network { path: request.path.clone(), reason: "offline".into() });
                }
                Ok(match self.files.get(&request.path) {
                    Some(body) => CachedResponse::new(200, None, body.clone()),
                    None => CachedResponse::new(404, None, Vec::new()),
                })
            }
            .boxed()
        }
    }

    fn manifest(generation: &str, paths: &[&str]) -> AssetManifest {
        AssetManifest::new(generation, paths.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_default_manifest() {
        let m = AssetManifest::default();
        assert_eq!(m.generation(), "hazardlite-cache-v1");
        assert_eq!(m.assets().len(), 7);
        assert_eq!(m.assets()[0], "/");
        assert!(AssetManifest::new(m.generation(), m.assets().to_vec()).is_ok());
    }

    #[test]
    fn test_manifest_validation() {
        assert!(AssetManifest::new("", vec![]).is_err());
        assert!(AssetManifest::new("v1", vec!["index.html".into()]).is_err());
        assert!(AssetManifest::new("v1", vec!["/a".into(), "/a".into()]).is_err());
        assert!(AssetManifest::new("../escape", vec![]).is_err());
    }

    #[test]
    fn test_request_method_normalized() {
        assert!(AssetRequest::new("get", "/").is_get());
        assert!(!AssetRequest::new("POST", "/").is_get());
    }

    #[tokio::test]
    async fn test_install_then_hit_skips_network() {
        let origin = Arc::new(TableOrigin::with_assets(&["/", "/main.js"]));
        let cache = OfflineAssetCache::new(
            manifest("v1", &["/", "/main.js"]),
            Arc::new(MemoryCacheStorage::new()),
            origin.clone(),
        );
        assert_eq!(cache.phase(), CachePhase::Idle);
        assert_eq!(cache.install().await.unwrap(), 2);
        assert_eq!(cache.phase(), CachePhase::Installed);

        let before = origin.calls.load(Ordering::SeqCst);
        let hit = cache.intercept(&AssetRequest::get("/main.js")).await.unwrap();
        assert_eq!(hit.source, ResponseSource::Cache);
        assert_eq!(hit.response.body, b"/main.js".to_vec());
        assert_eq!(origin.calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let cache = OfflineAssetCache::new(
            manifest("v1", &["/", "/missing.css"]),
            storage.clone(),
            Arc::new(TableOrigin::with_assets(&["/"])),
        );
        assert!(matches!(cache.install().await, Err(CacheError::BadStatus { status: 404, .. })));
        assert_eq!(storage.lookup("v1", "/").unwrap(), None);
        assert_eq!(cache.phase(), CachePhase::Idle);
    }

    #[tokio::test]
    async fn test_miss_goes_to_network_without_storing() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let origin = Arc::new(TableOrigin::with_assets(&["/", "/extra.json"]));
        let cache = OfflineAssetCache::new(manifest("v1", &["/"]), storage.clone(), origin.clone());
        cache.install().await.unwrap();

        let miss = cache.intercept(&AssetRequest::get("/extra.json")).await.unwrap();
        assert_eq!(miss.source, ResponseSource::Network);
        assert_eq!(storage.lookup("v1", "/extra.json").unwrap(), None);
    }

    #[tokio::test]
    async fn test_offline_miss_propagates_error() {
        let origin = Arc::new(TableOrigin { offline: true, ..Default::default() });
        let cache = OfflineAssetCache::new(manifest("v1", &[]), Arc::new(MemoryCacheStorage::new()), origin);
        assert!(matches!(
            cache.intercept(&AssetRequest::get("/anything")).await,
            Err(CacheError::Network { .. })
        ));
    }

    #[tokio::test]
    async fn test_non_get_bypasses_cache() {
        let origin = Arc::new(TableOrigin::with_assets(&["/"]));
        let cache = OfflineAssetCache::new(manifest("v1", &["/"]), Arc::new(MemoryCacheStorage::new()), origin.clone());
        cache.install().await.unwrap();
        let outcome = cache.intercept(&AssetRequest::new("POST", "/")).await.unwrap();
        assert_eq!(outcome.source, ResponseSource::Network);
    }

    #[tokio::test]
    async fn test_activate_purges_old_generations() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let origin = Arc::new(TableOrigin::with_assets(&["/"]));

        let v1 = OfflineAssetCache::new(manifest("v1", &["/"]), storage.clone(), origin.clone());
        v1.install().await.unwrap();
        v1.activate().await.unwrap();
        storage.open("unrelated-bucket").unwrap();

        let v2 = OfflineAssetCache::new(manifest("v2", &["/"]), storage.clone(), origin);
        v2.install().await.unwrap();
        let mut deleted = v2.activate().await.unwrap();
        deleted.sort();
        assert_eq!(deleted, vec!["unrelated-bucket".to_string(), "v1".to_string()]);
        assert_eq!(storage.bucket_names().unwrap(), vec!["v2".to_string()]);
        assert_eq!(v2.phase(), CachePhase::Active);

        assert!(v2.activate().await.unwrap().is_empty());
        assert_eq!(storage.bucket_names().unwrap(), vec!["v2".to_string()]);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let storage = Arc::new(MemoryCacheStorage::new());
        storage.open("v1").unwrap();
        let cache = OfflineAssetCache::new(manifest("v2", &["/"]), storage.clone(), Arc::new(TableOrigin::default()));

        assert!(matches!(cache.activate().await, Err(CacheError::NotInstalled(g)) if g == "v2"));
        assert_eq!(cache.phase(), CachePhase::Idle);
        assert_eq!(storage.bucket_names().unwrap(), vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_upgrade_keeps_previous_generation() {
        let storage = Arc::new(MemoryCacheStorage::new());
        let v1 = OfflineAssetCache::new(
            manifest("v1", &["/", "/main.js"]),
            storage.clone(),
            Arc::new(TableOrigin::with_assets(&["/", "/main.js"])),
        );
        v1.install().await.unwrap();
        v1.activate().await.unwrap();

        let offline = Arc::new(TableOrigin { offline: true, ..Default::default() });
        let v2 = OfflineAssetCache::new(manifest("v2", &["/", "/main.js"]), storage.clone(), offline.clone());
        assert!(v2.install().await.is_err());
        assert!(v2.activate().await.is_err());
        assert_eq!(storage.bucket_names().unwrap(), vec!["v1".to_string()]);

        let calls = offline.calls.load(Ordering::SeqCst);
        let hit = v2.intercept(&AssetRequest::get("/main.js")).await.unwrap();
        assert_eq!(hit.source, ResponseSource::Cache);
        assert_eq!(hit.response.body, b"/main.js".to_vec());
        assert_eq!(offline.calls.load(Ordering::SeqCst), calls);
    }
}
