/*!
Test Harness pour HazardLite

Assemble les composants du cœur autour des stubs du devkit :
- Store de zones (démo par défaut, ou GeoJSON fourni)
- Évaluateur et résolveur de localisation branchés sur les mocks
- Cache hors-ligne sur stockage mémoire partagé
*/

use crate::geocoder_stub::MockGeocoder;
use crate::origin_stub::MockOrigin;
use crate::position_stub::MockPositioning;
use anyhow::Result;
use hazardlite_core::cache::MemoryCacheStorage;
use hazardlite_core::{
    AssetManifest, CacheStorage, GeoPoint, HazardEvaluator, HazardZoneStore, LocationResolver, MatchPolicy,
    OfflineAssetCache,
};
use serde_json::Value;
use std::sync::Arc;

/// Harness de test complet. Les mocks sont partagés (Arc) avec les
/// composants construits, les compteurs restent donc observables.
pub struct TestHarness {
    store: Arc<HazardZoneStore>,
    policy: MatchPolicy,
    geocoder: Arc<MockGeocoder>,
    positioning: Option<Arc<MockPositioning>>,
    origin: Arc<MockOrigin>,
    storage: Arc<dyn CacheStorage>,
    manifest: AssetManifest,
}

impl TestHarness {
    /// Zone démo, géocodeur vide, pas de positionnement, origine servant
    /// le manifest par défaut.
    pub fn new() -> Self {
        env_logger::try_init().ok(); // Init logging pour tests

        Self {
            store: Arc::new(HazardZoneStore::demo()),
            policy: MatchPolicy::default(),
            geocoder: Arc::new(MockGeocoder::empty()),
            positioning: None,
            origin: Arc::new(MockOrigin::serving_manifest()),
            storage: Arc::new(MemoryCacheStorage::new()),
            manifest: AssetManifest::default(),
        }
    }

    pub fn with_geocoder(mut self, geocoder: MockGeocoder) -> Self {
        self.geocoder = Arc::new(geocoder);
        self
    }

    pub fn with_positioning(mut self, positioning: MockPositioning) -> Self {
        self.positioning = Some(Arc::new(positioning));
        self
    }

    /// Plateforme sans positionnement
    pub fn without_positioning(mut self) -> Self {
        self.positioning = None;
        self
    }

    pub fn with_origin(mut self, origin: MockOrigin) -> Self {
        self.origin = Arc::new(origin);
        self
    }

    pub fn with_store(mut self, store: HazardZoneStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Charge les zones depuis une FeatureCollection GeoJSON
    pub fn with_zones_geojson(self, collection: Value) -> Result<Self> {
        let store = HazardZoneStore::from_geojson_str(&serde_json::to_string(&collection)?)?;
        log::info!("🗺️ Loaded {} test zones", store.len());
        Ok(self.with_store(store))
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_manifest(mut self, manifest: AssetManifest) -> Self {
        self.manifest = manifest;
        self
    }

    /// Remplace le stockage mémoire (ex. DiskCacheStorage sur un tempdir)
    pub fn with_storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn evaluator(&self) -> Arc<HazardEvaluator> {
        Arc::new(HazardEvaluator::new(Arc::clone(&self.store)).with_policy(self.policy))
    }

    pub fn resolver(&self) -> Arc<LocationResolver> {
        let mut resolver = LocationResolver::new(self.geocoder.clone());
        if let Some(positioning) = &self.positioning {
            resolver = resolver.with_positioning(positioning.clone());
        }
        Arc::new(resolver)
    }

    /// Nouveau cache sur le stockage partagé : deux caches successifs
    /// simulent un redémarrage ou une nouvelle génération.
    pub fn cache(&self) -> Arc<OfflineAssetCache> {
        Arc::new(OfflineAssetCache::new(self.manifest.clone(), Arc::clone(&self.storage), self.origin.clone()))
    }

    pub fn geocoder(&self) -> &MockGeocoder {
        &self.geocoder
    }

    pub fn positioning(&self) -> Option<&MockPositioning> {
        self.positioning.as_deref()
    }

    pub fn origin(&self) -> &MockOrigin {
        &self.origin
    }

    pub fn storage(&self) -> Arc<dyn CacheStorage> {
        Arc::clone(&self.storage)
    }

    pub fn store(&self) -> &HazardZoneStore {
        &self.store
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Raccourci pour les points de test connus valides
pub fn point(lat: f64, lon: f64) -> GeoPoint {
    GeoPoint::new(lat, lon).unwrap_or_else(|e| panic!("invalid test point ({lat}, {lon}): {e}"))
}

/// FeatureCollection GeoJSON à une zone rectangulaire
pub fn rectangle_zone(name: &str, level: &str, min: (f64, f64), max: (f64, f64)) -> Value {
    let (min_lon, min_lat) = min;
    let (max_lon, max_lat) = max;
    serde_json::json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": { "name": name, "level": level },
            "geometry": {
                "type": "Polygon",
                "coordinates": [[
                    [min_lon, min_lat], [max_lon, min_lat], [max_lon, max_lat],
                    [min_lon, max_lat], [min_lon, min_lat]
                ]]
            }
        }]
    })
}
