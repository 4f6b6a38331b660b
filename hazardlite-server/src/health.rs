use crate::state::AppState;
use hazardlite_core::CachePhase;
use serde::Serialize;
use std::time::Instant;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

#[derive(Debug, Serialize)]
pub struct ServerHealth {
    pub uptime_seconds: u64,
    pub started_at: String,
    pub zones_loaded: u32,
    pub cache_generation: String,
    pub cache_phase: CachePhase,
    pub has_current_result: bool,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
    started_at: OffsetDateTime,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self { start_time: Instant::now(), started_at: OffsetDateTime::now_utc() }
    }

    pub fn get_health(&self, app: &AppState) -> ServerHealth {
        ServerHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            started_at: self.started_at.format(&Rfc3339).unwrap_or_default(),
            zones_loaded: app.evaluator.store().len() as u32,
            cache_generation: app.cache.manifest().generation().to_string(),
            cache_phase: app.cache.phase(),
            has_current_result: app.board.current().is_some(),
        }
    }
}

impl Default for HealthTracker {
    fn default() -> Self {
        Self::new()
    }
}
