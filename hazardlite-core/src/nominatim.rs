//! Geocoding against an OpenStreetMap Nominatim search endpoint.
//!
//! Request: `GET {base}/search?format=json&q=..&countrycodes=..&limit=..`
//! with an `Accept-Language` header. The response is a JSON array of places
//! whose `lat` / `lon` are decimal strings; anything that does not fit that
//! shape is reported as a network error.

use crate::location::{GeocodeQuery, GeocodeResponse, Geocoder, ResolutionError};
use crate::models::GeoPoint;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::ACCEPT_LANGUAGE;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, query: &GeocodeQuery) -> Result<GeocodeResponse, ResolutionError> {
        let url = format!("{}/search", self.base_url);
        let limit = query.limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json"),
                ("q", query.text.as_str()),
                ("countrycodes", query.country_code.as_str()),
                ("limit", limit.as_str()),
            ])
            .header(ACCEPT_LANGUAGE, query.language.as_str())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ResolutionError::NetworkError(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| ResolutionError::NetworkError(e.to_string()))?;
        debug!(bytes = body.len(), "nominatim response received");
        parse_places(&body)
    }
}

impl Geocoder for NominatimGeocoder {
    fn search<'a>(
        &'a self,
        query: &'a GeocodeQuery,
    ) -> BoxFuture<'a, Result<GeocodeResponse, ResolutionError>> {
        self.fetch(query).boxed()
    }
}

/// Validates a raw Nominatim body into a tagged response.
fn parse_places(body: &str) -> Result<GeocodeResponse, ResolutionError> {
    let malformed = |what: String| ResolutionError::NetworkError(format!("malformed geocoder response: {what}"));

    let places: Vec<NominatimPlace> = serde_json::from_str(body).map_err(|e| malformed(e.to_string()))?;
    let Some(first) = places.into_iter().next() else {
        return Ok(GeocodeResponse::NoCandidates);
    };

    let lat: f64 = first.lat.trim().parse().map_err(|_| malformed(format!("lat '{}'", first.lat)))?;
    let lon: f64 = first.lon.trim().parse().map_err(|_| malformed(format!("lon '{}'", first.lon)))?;
    let point = GeoPoint::new(lat, lon).map_err(|e| malformed(e.to_string()))?;

    Ok(GeocodeResponse::CandidateFound { point, label: first.display_name })
}
