//! HazardLite core - flood hazard lookup for a single demo region
//!
//! Building blocks shared by the server and the devkit:
//! - Hazard zones (validated polygons) and the point-in-polygon evaluator
//! - Report formatting and the single-result presentation board
//! - Location resolution through geocoding and device positioning collaborators
//! - Versioned offline asset cache (install / activate / cache-first intercept)

pub mod cache;
pub mod evaluator;
pub mod location;
pub mod models;
pub mod nominatim;
pub mod report;
pub mod zones;

pub use cache::{
    AssetFetcher, AssetManifest, AssetRequest, CacheError, CachePhase, CacheStorage,
    CachedResponse, InterceptOutcome, OfflineAssetCache, ResponseSource,
};
pub use evaluator::{HazardEvaluator, MatchPolicy};
pub use location::{
    FixedPosition, GeocodeQuery, GeocodeResponse, Geocoder, LocationResolver, PositionError,
    PositionProvider, ResolutionError, ResolvedLocation,
};
pub use models::{CoordinateError, GeoPoint, HazardEvaluation, HazardLevel};
pub use nominatim::NominatimGeocoder;
pub use report::{format_report, CurrentResult, HazardReport, ResultBoard, Ticket};
pub use zones::{HazardZone, HazardZoneStore, ZoneError};
