//! Hazard zones and the read-only store holding them.
//!
//! Zones are validated once at construction: a ring must be closed, have at
//! least three distinct vertices, stay inside WGS84 ranges and must not cross
//! itself. The evaluator relies on these guarantees and never re-checks them.
//!
//! The on-disk format is a GeoJSON `FeatureCollection` of `Polygon` features
//! carrying `level` and `name` properties, the same shape the map overlay uses.

use crate::models::{CoordinateError, GeoPoint, HazardLevel};
use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Area, Coord, Intersects, LineString, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::path::Path;
use tracing::{debug, info};

pub const DEMO_ZONE_NAME: &str = "Demo Flood Zone (Sample Only)";

#[derive(Debug, thiserror::Error)]
pub enum ZoneError {
    #[error("zone '{name}': ring needs at least 3 distinct vertices plus the closing vertex, got {count} positions")]
    TooFewVertices { name: String, count: usize },
    #[error("zone '{name}': ring is not closed (first vertex must be repeated last)")]
    UnclosedRing { name: String },
    #[error("zone '{name}': consecutive duplicate vertex at position {index}")]
    DegenerateEdge { name: String, index: usize },
    #[error("zone '{name}': edges meeting at vertex {index} fold back onto each other")]
    FoldedEdge { name: String, index: usize },
    #[error("zone '{name}': ring encloses no area")]
    ZeroArea { name: String },
    #[error("zone '{name}': edges {first} and {second} intersect")]
    SelfIntersecting { name: String, first: usize, second: usize },
    #[error("zone '{name}': vertex {index} invalid: {source}")]
    InvalidVertex {
        name: String,
        index: usize,
        #[source]
        source: CoordinateError,
    },
    #[error("feature {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
    #[error("zone file is not a GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A named polygon with a severity level.
#[derive(Debug, Clone)]
pub struct HazardZone {
    level: HazardLevel,
    name: String,
    geometry: Polygon<f64>,
}

impl HazardZone {
    /// Builds a zone from a closed ring of `(longitude, latitude)` pairs.
    pub fn new(
        level: HazardLevel,
        name: impl Into<String>,
        ring: Vec<(f64, f64)>,
    ) -> Result<Self, ZoneError> {
        let name = name.into();
        validate_ring(&name, &ring)?;

        let exterior: LineString<f64> = ring
            .into_iter()
            .map(|(x, y)| Coord { x, y })
            .collect();

        Ok(Self {
            level,
            name,
            geometry: Polygon::new(exterior, Vec::new()),
        })
    }

    pub fn level(&self) -> HazardLevel {
        self.level
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry(&self) -> &Polygon<f64> {
        &self.geometry
    }

    /// Boundary-inclusive containment: edges and vertices count as inside.
    pub fn contains_point(&self, point: &GeoPoint) -> bool {
        matches!(
            self.geometry.coordinate_position(&point.to_coord()),
            CoordPos::Inside | CoordPos::OnBoundary
        )
    }

    fn from_feature(index: usize, feature: &Feature) -> Result<Self, ZoneError> {
        let invalid = |reason: String| ZoneError::InvalidFeature { index, reason };

        let name = feature
            .property("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("missing string property 'name'".into()))?
            .to_string();
        let level: HazardLevel = feature
            .property("level")
            .and_then(|v| v.as_str())
            .ok_or_else(|| invalid("missing string property 'level'".into()))?
            .parse()
            .map_err(invalid)?;

        let geometry = feature
            .geometry
            .as_ref()
            .ok_or_else(|| invalid("feature has no geometry".into()))?;
        let Value::Polygon(rings) = &geometry.value else {
            return Err(invalid("geometry is not a Polygon".into()));
        };
        match rings.len() {
            0 => return Err(invalid("polygon has no rings".into())),
            1 => {}
            _ => return Err(invalid("polygons with holes are not supported".into())),
        }

        let ring = rings[0]
            .iter()
            .map(|pos| match pos.as_slice() {
                [lon, lat, ..] => Ok((*lon, *lat)),
                _ => Err(invalid("position needs longitude and latitude".into())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(level, name, ring)
    }

    fn to_feature(&self) -> Feature {
        let ring: Vec<Vec<f64>> = self
            .geometry
            .exterior()
            .coords()
            .map(|c| vec![c.x, c.y])
            .collect();

        let mut properties = JsonObject::new();
        properties.insert("level".into(), self.level.to_string().into());
        properties.insert("name".into(), self.name.clone().into());

        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: None,
            properties: Some(properties),
            foreign_members: None,
        }
    }
}

fn validate_ring(name: &str, ring: &[(f64, f64)]) -> Result<(), ZoneError> {
    for (index, (lon, lat)) in ring.iter().enumerate() {
        GeoPoint::new(*lat, *lon).map_err(|source| ZoneError::InvalidVertex {
            name: name.to_string(),
            index,
            source,
        })?;
    }

    if ring.len() < 4 {
        return Err(ZoneError::TooFewVertices { name: name.to_string(), count: ring.len() });
    }
    if ring.first() != ring.last() {
        return Err(ZoneError::UnclosedRing { name: name.to_string() });
    }
    if let Some(index) = ring.windows(2).position(|w| w[0] == w[1]) {
        return Err(ZoneError::DegenerateEdge { name: name.to_string(), index: index + 1 });
    }

    let distinct = &ring[..ring.len() - 1];
    let mut unique: Vec<(f64, f64)> = Vec::with_capacity(distinct.len());
    for v in distinct {
        if !unique.contains(v) {
            unique.push(*v);
        }
    }
    if unique.len() < 3 {
        return Err(ZoneError::TooFewVertices { name: name.to_string(), count: ring.len() });
    }

    // Neighbouring edges may only touch at their shared vertex: a turn of
    // exactly 180 degrees makes them overlap.
    let n = distinct.len();
    for index in 0..n {
        let (px, py) = distinct[(index + n - 1) % n];
        let (cx, cy) = distinct[index];
        let (nx, ny) = distinct[(index + 1) % n];
        let (ax, ay, bx, by) = (cx - px, cy - py, nx - cx, ny - cy);
        if ax * by - ay * bx == 0.0 && ax * bx + ay * by < 0.0 {
            return Err(ZoneError::FoldedEdge { name: name.to_string(), index });
        }
    }

    // Adjacent edges share a vertex, so only non-neighbours are compared.
    let edges: Vec<geo::Line<f64>> = ring
        .windows(2)
        .map(|w| geo::Line::new(Coord { x: w[0].0, y: w[0].1 }, Coord { x: w[1].0, y: w[1].1 }))
        .collect();
    let last = edges.len() - 1;
    for i in 0..edges.len() {
        for j in (i + 2)..edges.len() {
            if i == 0 && j == last {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return Err(ZoneError::SelfIntersecting { name: name.to_string(), first: i, second: j });
            }
        }
    }

    let polygon = Polygon::new(LineString::from(ring.to_vec()), Vec::new());
    if polygon.unsigned_area() == 0.0 {
        return Err(ZoneError::ZeroArea { name: name.to_string() });
    }
    Ok(())
}

/// Immutable, ordered collection of zones. Order matters: it is the
/// tie-break when zones overlap.
#[derive(Debug, Clone, Default)]
pub struct HazardZoneStore {
    zones: Vec<HazardZone>,
}

impl HazardZoneStore {
    pub fn new(zones: Vec<HazardZone>) -> Self {
        Self { zones }
    }

    /// The single sample zone shipped with the demo (Metro Manila area).
    pub fn demo() -> Self {
        let exterior = LineString::from(vec![
            (120.9, 14.5),
            (121.1, 14.5),
            (121.1, 14.8),
            (120.9, 14.8),
            (120.9, 14.5),
        ]);
        Self::new(vec![HazardZone {
            level: HazardLevel::High,
            name: DEMO_ZONE_NAME.to_string(),
            geometry: Polygon::new(exterior, Vec::new()),
        }])
    }

    pub fn from_geojson_str(text: &str) -> Result<Self, ZoneError> {
        let GeoJson::FeatureCollection(collection) = text.parse::<GeoJson>()? else {
            return Err(ZoneError::NotAFeatureCollection);
        };

        let zones = collection
            .features
            .iter()
            .enumerate()
            .map(|(index, feature)| HazardZone::from_feature(index, feature))
            .collect::<Result<Vec<_>, _>>()?;

        for zone in &zones {
            debug!(zone = zone.name(), severity = %zone.level(), "loaded hazard zone");
        }
        Ok(Self::new(zones))
    }

    pub fn load_geojson(path: impl AsRef<Path>) -> Result<Self, ZoneError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let store = Self::from_geojson_str(&text)?;
        info!(path = %path.display(), zones = store.len(), "hazard zones loaded");
        Ok(store)
    }

    pub fn all_zones(&self) -> &[HazardZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Zone overlay for the map widget.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.zones.iter().map(HazardZone::to_feature).collect(),
            foreign_members: None,
        }
    }
}
