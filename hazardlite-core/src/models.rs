//! Value types flowing between the evaluator, the formatter and the resolver.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),
    #[error("coordinate is not a finite number")]
    NotFinite,
}

/// A WGS84 position. Fields are only reachable through [`GeoPoint::new`], so
/// every value in circulation is in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawPoint> for GeoPoint {
    type Error = CoordinateError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Planar coordinate in GeoJSON axis order (x = longitude, y = latitude).
    pub fn to_coord(&self) -> geo::Coord<f64> {
        geo::coord! { x: self.longitude, y: self.latitude }
    }
}

/// Severity of a hazard zone. Variant order is the severity order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HazardLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for HazardLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HazardLevel::Low => "Low",
            HazardLevel::Medium => "Medium",
            HazardLevel::High => "High",
        };
        f.write_str(label)
    }
}

impl FromStr for HazardLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(HazardLevel::Low),
            "medium" => Ok(HazardLevel::Medium),
            "high" => Ok(HazardLevel::High),
            other => Err(format!("unknown hazard level: {other}")),
        }
    }
}

/// Outcome of testing one point against the zone store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HazardEvaluation {
    NoMatch,
    Matched { level: HazardLevel, zone_name: String },
}

impl HazardEvaluation {
    pub fn is_match(&self) -> bool {
        matches!(self, HazardEvaluation::Matched { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ranges() {
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
        assert_eq!(GeoPoint::new(90.5, 0.0), Err(CoordinateError::Latitude(90.5)));
        assert_eq!(GeoPoint::new(0.0, -180.1), Err(CoordinateError::Longitude(-180.1)));
        assert_eq!(GeoPoint::new(f64::NAN, 0.0), Err(CoordinateError::NotFinite));
    }

    #[test]
    fn test_point_axis_order() {
        let p = GeoPoint::new(14.65, 121.0).unwrap();
        let c = p.to_coord();
        assert_eq!(c.x, 121.0);
        assert_eq!(c.y, 14.65);
    }

    #[test]
    fn test_point_deserialize_rejects_out_of_range() {
        let ok: GeoPoint = serde_json::from_str(r#"{"latitude":14.5,"longitude":121.0}"#).unwrap();
        assert_eq!(ok.latitude(), 14.5);
        assert!(serde_json::from_str::<GeoPoint>(r#"{"latitude":95.0,"longitude":0.0}"#).is_err());
    }

    #[test]
    fn test_level_order_and_parse() {
        assert!(HazardLevel::Low < HazardLevel::Medium);
        assert!(HazardLevel::Medium < HazardLevel::High);
        assert_eq!("High".parse::<HazardLevel>(), Ok(HazardLevel::High));
        assert_eq!(" medium ".parse::<HazardLevel>(), Ok(HazardLevel::Medium));
        assert!("extreme".parse::<HazardLevel>().is_err());
        assert_eq!(HazardLevel::High.to_string(), "High");
    }
}
