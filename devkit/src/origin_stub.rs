/*!
Origine d'assets en mémoire pour tester le cache hors-ligne

Sert une table chemin → contenu, compte chaque fetch (total et par chemin)
et peut simuler une coupure réseau ou un asset en échec.
*/

use futures::future::BoxFuture;
use futures::FutureExt;
use hazardlite_core::cache::DEFAULT_ASSETS;
use hazardlite_core::{AssetFetcher, AssetRequest, CacheError, CachedResponse};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct MockOrigin {
    files: Mutex<HashMap<String, Vec<u8>>>,
    broken: Mutex<HashSet<String>>,
    offline: AtomicBool,
    fetches: Mutex<Vec<String>>,
}

impl MockOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sert les 7 assets du manifest par défaut
    pub fn serving_manifest() -> Self {
        let origin = Self::new();
        for path in DEFAULT_ASSETS {
            origin.put(path, format!("content of {path}").into_bytes());
        }
        origin
    }

    pub fn with_asset(self, path: &str, body: &str) -> Self {
        self.put(path, body.as_bytes().to_vec());
        self
    }

    pub fn put(&self, path: &str, body: Vec<u8>) {
        self.files.lock().insert(path.to_string(), body);
    }

    /// Ce chemin échouera au niveau transport
    pub fn break_path(&self, path: &str) {
        self.broken.lock().insert(path.to_string());
    }

    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
        log::info!("📴 [MOCK] origin offline");
    }

    pub fn go_online(&self) {
        self.offline.store(false, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().len()
    }

    pub fn fetches_for(&self, path: &str) -> usize {
        self.fetches.lock().iter().filter(|p| p.as_str() == path).count()
    }

    fn respond(&self, request: &AssetRequest) -> Result<CachedResponse, CacheError> {
        if self.offline.load(Ordering::SeqCst) || self.broken.lock().contains(&request.path) {
            return Err(CacheError::Network { path: request.path.clone(), reason: "simulated outage".into() });
        }
        Ok(match self.files.lock().get(&request.path) {
            Some(body) => CachedResponse::new(200, Some("text/plain".into()), body.clone()),
            None => CachedResponse::new(404, None, Vec::new()),
        })
    }
}

impl AssetFetcher for MockOrigin {
    fn fetch<'a>(&'a self, request: &'a AssetRequest) -> BoxFuture<'a, Result<CachedResponse, CacheError>> {
        self.fetches.lock().push(request.path.clone());
        log::debug!("🌐 [MOCK] fetch {} {}", request.method, request.path);
        let result = self.respond(request);
        async move { result }.boxed()
    }
}
