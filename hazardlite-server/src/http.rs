/**
 * API HTTP HAZARDLITE - Couche de présentation du démonstrateur
 *
 * RÔLE :
 * Expose les trois chemins d'entrée d'un point (clic carte, recherche,
 * géolocalisation) et sert le shell applicatif via le cache hors-ligne.
 *
 * FONCTIONNEMENT :
 * - /api/evaluate : clic carte → évaluation → rapport courant
 * - /api/search   : géocodage → évaluation → rapport courant (ticket : une
 *   réponse dépassée par une interaction plus récente est ignorée)
 * - /api/locate   : position de l'appareil → évaluation → rapport courant
 * - /api/report   : rapport courant (204 si aucun)
 * - /api/zones    : zones en GeoJSON pour la surcouche carte
 * - tout le reste : intercept cache-first (assets du shell)
 *
 * ERREURS : chaque échec est renvoyé tel quel au client, sans retry.
 */

use crate::state::AppState;
use axum::extract::{Query, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use hazardlite_core::{
    AssetRequest, CacheError, CoordinateError, CurrentResult, GeoPoint, ResolutionError, ResponseSource,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

pub const SOURCE_HEADER: &str = "x-hazardlite-source";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("invalid coordinate: {0}")]
    Coordinate(#[from] CoordinateError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            ApiError::Coordinate(e) => (StatusCode::BAD_REQUEST, format!("Invalid coordinate: {e}")),
            ApiError::Resolution(e) => match e {
                ResolutionError::EmptyQuery => (StatusCode::BAD_REQUEST, "Please enter a place to search.".into()),
                ResolutionError::NotFound => (StatusCode::NOT_FOUND, "No results found.".into()),
                ResolutionError::NetworkError(_) => {
                    (StatusCode::BAD_GATEWAY, "Search failed. Please try again.".into())
                }
                ResolutionError::UnsupportedPlatform => {
                    (StatusCode::NOT_IMPLEMENTED, "Geolocation is not supported on this host.".into())
                }
                ResolutionError::PermissionOrSignalError(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "Could not get your location.".into())
                }
            },
        };
        debug!(error = %self, status = code.as_u16(), "api error");
        (code, Json(serde_json::json!({ "ok": false, "error": msg }))).into_response()
    }
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    info!(
        %method,
        %path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    response
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/api/zones", get(get_zones))
        .route("/api/evaluate", get(evaluate_point))
        .route("/api/search", get(search))
        .route("/api/locate", get(locate))
        .route("/api/report", get(get_report))
        .fallback(serve_asset)
        .with_state(app_state)
        .layer(middleware::from_fn(log_requests))
}

#[derive(Debug, Deserialize)]
pub struct EvaluateParams {
    pub lat: f64,
    pub lon: f64,
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchView {
    #[serde(flatten)]
    pub result: CurrentResult,
    /// true si une interaction plus récente a déjà remplacé ce résultat
    pub superseded: bool,
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<crate::health::ServerHealth> {
    Json(app.health.get_health(&app))
}

// GET /api/zones (surcouche GeoJSON)
async fn get_zones(State(app): State<AppState>) -> Json<geojson::FeatureCollection> {
    Json(app.evaluator.store().to_feature_collection())
}

// GET /api/evaluate?lat=..&lon=..[&label=..] (clic carte)
async fn evaluate_point(
    State(app): State<AppState>,
    Query(params): Query<EvaluateParams>,
) -> Result<Json<CurrentResult>, ApiError> {
    let point = GeoPoint::new(params.lat, params.lon)?;
    let label = params
        .label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| "Map click".to_string());
    Ok(Json(app.publish(&label, point)))
}

// GET /api/search?q=..
async fn search(
    State(app): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchView>, ApiError> {
    let ticket = app.board.issue_ticket();
    let resolved = app.resolver.resolve_by_query(&params.q).await?;

    let result = app.evaluate(&resolved.label, resolved.point);
    let applied = app.board.set_current_result_for(ticket, result.clone());
    if !applied {
        warn!(query = %params.q, "search answered after a newer interaction, not displayed");
    }
    Ok(Json(SearchView { result, superseded: !applied }))
}

// GET /api/locate (géolocalisation)
async fn locate(State(app): State<AppState>) -> Result<Json<CurrentResult>, ApiError> {
    let point = app.resolver.resolve_by_device().await?;
    Ok(Json(app.publish("My location", point)))
}

// GET /api/report (résultat courant)
async fn get_report(State(app): State<AppState>) -> Response {
    match app.board.current() {
        Some(current) => Json(current).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

// Tout le reste : shell applicatif via le cache cache-first
async fn serve_asset(State(app): State<AppState>, method: Method, uri: Uri) -> Response {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let request = AssetRequest::new(method.as_str(), path);

    match app.cache.intercept(&request).await {
        Ok(outcome) => {
            let status = StatusCode::from_u16(outcome.response.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut response = (status, outcome.response.body).into_response();
            let headers = response.headers_mut();
            if let Some(ct) = outcome.response.content_type.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(CONTENT_TYPE, ct);
            }
            let source = match outcome.source {
                ResponseSource::Cache => "cache",
                ResponseSource::Network => "network",
            };
            headers.insert(SOURCE_HEADER, HeaderValue::from_static(source));
            response
        }
        Err(CacheError::InvalidPath(_)) => StatusCode::BAD_REQUEST.into_response(),
        Err(_) => (StatusCode::BAD_GATEWAY, "Offline and this resource is not cached.").into_response(),
    }
}
