/**
 * ÉTAT APPLICATIF - Assemblage des composants HazardLite pour Axum
 *
 * RÔLE : Un seul état partagé par tous les handlers : évaluateur de zones,
 * résolveur de lieux, tableau du résultat courant, cache d'assets, santé.
 *
 * FONCTIONNEMENT : Construit une fois au démarrage depuis la config, puis
 * cloné (Arc) dans chaque requête. Le seul état mutable est le ResultBoard.
 */

use crate::config::{AssetSourceConf, ServerConfig};
use crate::health::HealthTracker;
use anyhow::{Context, Result};
use hazardlite_core::cache::{DirectoryOrigin, DiskCacheStorage, HttpOrigin, MemoryCacheStorage};
use hazardlite_core::{
    format_report, AssetFetcher, AssetManifest, CacheStorage, CurrentResult, FixedPosition, GeoPoint,
    HazardEvaluator, HazardZoneStore, LocationResolver, NominatimGeocoder, OfflineAssetCache, ResultBoard,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<HazardEvaluator>,
    pub resolver: Arc<LocationResolver>,
    pub board: Arc<ResultBoard>,
    pub cache: Arc<OfflineAssetCache>,
    pub health: HealthTracker,
}

impl AppState {
    pub fn new(
        evaluator: Arc<HazardEvaluator>,
        resolver: Arc<LocationResolver>,
        cache: Arc<OfflineAssetCache>,
    ) -> Self {
        Self { evaluator, resolver, board: Arc::new(ResultBoard::new()), cache, health: HealthTracker::new() }
    }

    pub fn from_config(cfg: &ServerConfig) -> Result<Self> {
        // zones
        let store = match &cfg.zones.geojson_path {
            Some(path) => HazardZoneStore::load_geojson(path)
                .with_context(|| format!("failed to load hazard zones from {path}"))?,
            None => HazardZoneStore::demo(),
        };
        info!(zones = store.len(), policy = ?cfg.zones.match_policy, "hazard zones ready");
        let evaluator = HazardEvaluator::new(Arc::new(store)).with_policy(cfg.zones.match_policy);

        // géocodage + positionnement
        let geocoder = NominatimGeocoder::new(
            &cfg.geocoder.base_url,
            &cfg.geocoder.user_agent,
            Duration::from_secs(cfg.geocoder.timeout_secs),
        )
        .context("failed to build geocoder client")?;
        let mut resolver = LocationResolver::new(Arc::new(geocoder))
            .with_country_code(&cfg.geocoder.country_code)
            .with_language(&cfg.geocoder.language);
        if let Some(device) = &cfg.device {
            let point = GeoPoint::new(device.latitude, device.longitude).context("invalid device position")?;
            resolver = resolver.with_positioning(Arc::new(FixedPosition(point)));
        }

        // cache d'assets
        let manifest = AssetManifest::new(&cfg.cache.generation, cfg.cache.assets.clone())
            .context("invalid asset manifest")?;
        let storage: Arc<dyn CacheStorage> = match &cfg.cache.storage_dir {
            Some(dir) => Arc::new(
                DiskCacheStorage::new(dir).with_context(|| format!("failed to open cache storage {dir}"))?,
            ),
            None => Arc::new(MemoryCacheStorage::new()),
        };
        let fetcher: Arc<dyn AssetFetcher> = match &cfg.cache.source {
            AssetSourceConf::Directory { path } => Arc::new(DirectoryOrigin::new(path)),
            AssetSourceConf::Http { base_url } => Arc::new(
                HttpOrigin::new(base_url, Duration::from_secs(cfg.cache.timeout_secs))
                    .context("failed to build asset origin client")?,
            ),
        };
        let cache = OfflineAssetCache::new(manifest, storage, fetcher);

        Ok(Self::new(Arc::new(evaluator), Arc::new(resolver), Arc::new(cache)))
    }

    /// Cycle de vie du cache au démarrage : activate seulement après un
    /// install réussi, sinon les générations précédentes restent en service.
    pub async fn prepare_cache(&self) {
        match self.cache.install().await {
            Ok(count) => {
                info!(assets = count, "offline cache populated");
                match self.cache.activate().await {
                    Ok(deleted) if !deleted.is_empty() => info!(?deleted, "stale cache generations purged"),
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "offline cache activation failed"),
                }
            }
            Err(e) => error!(error = %e, "offline cache install failed, previous generation kept"),
        }
    }

    /// Évalue + formate sans toucher au résultat courant.
    pub fn evaluate(&self, label: &str, point: GeoPoint) -> CurrentResult {
        let evaluation = self.evaluator.evaluate(&point);
        CurrentResult { point, report: format_report(label, &point, &evaluation) }
    }

    /// Évalue, formate et remplace le résultat courant (dernier écrivain gagne).
    pub fn publish(&self, label: &str, point: GeoPoint) -> CurrentResult {
        let result = self.evaluate(label, point);
        self.board.set_current_result(result.clone());
        result
    }
}
