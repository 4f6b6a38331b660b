use hazardlite_core::cache::{DEFAULT_ASSETS, DEFAULT_GENERATION};
use hazardlite_core::location::{DEFAULT_COUNTRY_CODE, DEFAULT_LANGUAGE};
use hazardlite_core::nominatim::DEFAULT_BASE_URL;
use hazardlite_core::MatchPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConf,
    pub geocoder: GeocoderConf,
    pub zones: ZonesConf,
    pub cache: CacheConf,
    pub device: Option<DeviceConf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConf {
    pub bind: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConf {
    pub base_url: String,
    pub country_code: String,
    pub language: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ZonesConf {
    pub geojson_path: Option<String>, // absent => zone de démo
    pub match_policy: MatchPolicy,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConf {
    pub generation: String, // à incrémenter à chaque changement d'assets
    pub assets: Vec<String>,
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub source: AssetSourceConf,
    pub storage_dir: Option<String>, // absent => cache mémoire
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub enum AssetSourceConf {
    Directory { path: String },
    Http { base_url: String },
}

/// Position rapportée par `/api/locate` sur un hôte sans GPS.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeviceConf {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".into() }
    }
}

impl Default for GeocoderConf {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            country_code: DEFAULT_COUNTRY_CODE.into(),
            language: DEFAULT_LANGUAGE.into(),
            user_agent: concat!("hazardlite/", env!("CARGO_PKG_VERSION")).into(),
            timeout_secs: 10,
        }
    }
}

impl Default for CacheConf {
    fn default() -> Self {
        Self {
            generation: DEFAULT_GENERATION.into(),
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
            source: AssetSourceConf::Directory { path: "./web".into() },
            storage_dir: None,
            timeout_secs: 10,
        }
    }
}

fn parse_config(txt: &str) -> ServerConfig {
    if txt.trim().is_empty() {
        return ServerConfig::default();
    }
    serde_yaml::from_str(txt).unwrap_or_else(|e| {
        warn!("config invalide: {e}, usage config par défaut");
        ServerConfig::default()
    })
}

pub async fn load_config() -> ServerConfig {
    let path = std::env::var("HAZARDLITE_CONFIG").unwrap_or_else(|_| "hazardlite.yaml".into());
    let mut cfg = if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        info!(%path, "config chargée");
        parse_config(&txt)
    } else {
        warn!(%path, "pas de fichier de config, usage config par défaut");
        ServerConfig::default()
    };

    if let Ok(bind) = std::env::var("HAZARDLITE_BIND") {
        cfg.server.bind = bind;
    }
    cfg
}
