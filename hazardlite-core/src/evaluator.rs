//! Point-in-polygon hazard lookup.
//!
//! Zones are scanned in store order. With the default [`MatchPolicy::FirstMatch`]
//! the first zone containing the point wins, so store order is the tie-break
//! for overlapping zones. Points on a zone edge or vertex count as inside.

use crate::models::{GeoPoint, HazardEvaluation};
use crate::zones::{HazardZone, HazardZoneStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// First containing zone in store order.
    #[default]
    FirstMatch,
    /// Most severe containing zone; earliest in store order among equals.
    HighestSeverity,
}

#[derive(Debug, Clone)]
pub struct HazardEvaluator {
    store: Arc<HazardZoneStore>,
    policy: MatchPolicy,
}

impl HazardEvaluator {
    pub fn new(store: Arc<HazardZoneStore>) -> Self {
        Self { store, policy: MatchPolicy::default() }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn store(&self) -> &HazardZoneStore {
        &self.store
    }

    pub fn evaluate(&self, point: &GeoPoint) -> HazardEvaluation {
        let mut containing = self
            .store
            .all_zones()
            .iter()
            .filter(|zone| zone.contains_point(point));

        let selected: Option<&HazardZone> = match self.policy {
            MatchPolicy::FirstMatch => containing.next(),
            // `max_by_key` keeps the last maximum, so fold to keep the first.
            MatchPolicy::HighestSeverity => containing.fold(None, |best: Option<&HazardZone>, zone| {
                match best {
                    Some(b) if b.level() >= zone.level() => Some(b),
                    _ => Some(zone),
                }
            }),
        };

        let evaluation = match selected {
            Some(zone) => HazardEvaluation::Matched {
                level: zone.level(),
                zone_name: zone.name().to_string(),
            },
            None => HazardEvaluation::NoMatch,
        };
        trace!(
            lat = point.latitude(),
            lon = point.longitude(),
            matched = evaluation.is_match(),
            "hazard evaluated"
        );
        evaluation
    }
}
