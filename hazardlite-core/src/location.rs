//! Location resolution: free-text search and device positioning.
//!
//! Both paths delegate to an external collaborator, make exactly one attempt
//! and hand failures straight back to the caller. No caching, no retry.

use crate::models::GeoPoint;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

pub const DEFAULT_COUNTRY_CODE: &str = "ph";
pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("search query is empty")]
    EmptyQuery,
    #[error("no results found")]
    NotFound,
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("positioning is not supported on this platform")]
    UnsupportedPlatform,
    #[error("could not get device position: {0}")]
    PermissionOrSignalError(String),
}

/// What is sent to the geocoding collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery {
    pub text: String,
    pub country_code: String,
    pub language: String,
    pub limit: u8,
}

/// Validated geocoder answer.
#[derive(Debug, Clone, PartialEq)]
pub enum GeocodeResponse {
    CandidateFound { point: GeoPoint, label: String },
    NoCandidates,
}

pub trait Geocoder: Send + Sync {
    fn search<'a>(
        &'a self,
        query: &'a GeocodeQuery,
    ) -> BoxFuture<'a, Result<GeocodeResponse, ResolutionError>>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("position request timed out")]
    Timeout,
    #[error("position unavailable: {0}")]
    Unavailable(String),
}

pub trait PositionProvider: Send + Sync {
    /// False when the host has no positioning capability at all.
    fn is_supported(&self) -> bool {
        true
    }

    fn current_position(&self) -> BoxFuture<'_, Result<GeoPoint, PositionError>>;
}

/// Positioning for hosts without a device: always reports one configured point.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub GeoPoint);

impl PositionProvider for FixedPosition {
    fn current_position(&self) -> BoxFuture<'_, Result<GeoPoint, PositionError>> {
        let point = self.0;
        async move { Ok(point) }.boxed()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedLocation {
    pub point: GeoPoint,
    pub label: String,
}

pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    positioning: Option<Arc<dyn PositionProvider>>,
    country_code: String,
    language: String,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            positioning: None,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }

    pub fn with_positioning(mut self, provider: Arc<dyn PositionProvider>) -> Self {
        self.positioning = Some(provider);
        self
    }

    pub fn with_country_code(mut self, code: impl Into<String>) -> Self {
        self.country_code = code.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub async fn resolve_by_query(&self, text: &str) -> Result<ResolvedLocation, ResolutionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ResolutionError::EmptyQuery);
        }

        let query = GeocodeQuery {
            text: text.to_string(),
            country_code: self.country_code.clone(),
            language: self.language.clone(),
            limit: 1,
        };
        debug!(query = %query.text, country = %query.country_code, "geocoding");

        match self.geocoder.search(&query).await {
            Ok(GeocodeResponse::CandidateFound { point, label }) => Ok(ResolvedLocation { point, label }),
            Ok(GeocodeResponse::NoCandidates) => Err(ResolutionError::NotFound),
            Err(e) => {
                warn!(query = %query.text, error = %e, "geocoding failed");
                Err(e)
            }
        }
    }

    pub async fn resolve_by_device(&self) -> Result<GeoPoint, ResolutionError> {
        let provider = match &self.positioning {
            Some(p) if p.is_supported() => p,
            _ => return Err(ResolutionError::UnsupportedPlatform),
        };

        provider.current_position().await.map_err(|e| {
            warn!(error = %e, "device positioning failed");
            ResolutionError::PermissionOrSignalError(e.to_string())
        })
    }
}
