//! Hazard report formatting and the presentation state holding the current
//! result.

use crate::models::{GeoPoint, HazardEvaluation};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use tracing::debug;

pub const NO_MATCH_SUMMARY: &str = "No flood hazard data here.";
pub const NO_MATCH_DETAIL: &str = "Point is outside the demo flood polygon.";
pub const DISCLAIMER: &str = "This is a simplified demo. For official hazard maps, use government tools like HazardHunterPH and agency sites.";

/// Display-ready report for one evaluated location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HazardReport {
    pub location_label: String,
    pub coordinates: String,
    pub summary: String,
    pub detail: String,
    pub disclaimer: String,
}

/// Builds the report shown for an evaluated point. Pure: equal inputs give
/// equal reports.
pub fn format_report(
    location_label: &str,
    point: &GeoPoint,
    evaluation: &HazardEvaluation,
) -> HazardReport {
    let (summary, detail) = match evaluation {
        HazardEvaluation::Matched { level, zone_name } => (
            format!("Flood hazard: {level}"),
            format!("Inside: {zone_name}. This is only sample data."),
        ),
        HazardEvaluation::NoMatch => (NO_MATCH_SUMMARY.to_string(), NO_MATCH_DETAIL.to_string()),
    };

    HazardReport {
        location_label: location_label.to_string(),
        coordinates: format!("{:.5}, {:.5}", point.latitude(), point.longitude()),
        summary,
        detail,
        disclaimer: DISCLAIMER.to_string(),
    }
}

impl fmt::Display for HazardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Location: {}", self.location_label)?;
        writeln!(f, "Coordinates: {}", self.coordinates)?;
        writeln!(f, "Flood: {}", self.summary)?;
        writeln!(f, "{}", self.detail)?;
        write!(f, "{}", self.disclaimer)
    }
}

/// The point and report currently on display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentResult {
    pub point: GeoPoint,
    pub report: HazardReport,
}

/// Identifies one in-flight interaction. Later tickets supersede earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
struct BoardState {
    latest: u64,
    current: Option<CurrentResult>,
}

/// Single-slot presentation state. Writes replace the previous result; a
/// ticketed write is dropped when a newer interaction started after it.
#[derive(Debug, Default)]
pub struct ResultBoard {
    state: Mutex<BoardState>,
}

impl ResultBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue_ticket(&self) -> Ticket {
        let mut state = self.state.lock();
        state.latest += 1;
        Ticket(state.latest)
    }

    /// Unconditional last-writer-wins update. Also supersedes every ticket
    /// issued so far.
    pub fn set_current_result(&self, result: CurrentResult) {
        let mut state = self.state.lock();
        state.latest += 1;
        state.current = Some(result);
    }

    /// Applies `result` only if `ticket` is still the latest interaction.
    pub fn set_current_result_for(&self, ticket: Ticket, result: CurrentResult) -> bool {
        let mut state = self.state.lock();
        if ticket.0 != state.latest {
            debug!(ticket = ticket.0, latest = state.latest, "dropping superseded result");
            return false;
        }
        state.current = Some(result);
        true
    }

    pub fn current(&self) -> Option<CurrentResult> {
        self.state.lock().current.clone()
    }
}
