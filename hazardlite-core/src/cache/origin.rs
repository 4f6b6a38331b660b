//! Network side of the asset cache: an upstream HTTP origin or a local
//! directory of static files.

use super::{AssetFetcher, AssetRequest, CacheError, CachedResponse};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::header::CONTENT_TYPE;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Fetches assets from `{base_url}{path}`.
#[derive(Clone)]
pub struct HttpOrigin {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOrigin {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_string() })
    }

    async fn fetch_remote(&self, request: &AssetRequest) -> Result<CachedResponse, CacheError> {
        let network = |e: reqwest::Error| CacheError::Network { path: request.path.clone(), reason: e.to_string() };

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| CacheError::InvalidPath(format!("unsupported method {}", request.method)))?;
        let url = format!("{}{}", self.base_url, request.path);

        let response = self.client.request(method, &url).send().await.map_err(network)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(network)?;

        debug!(%url, status, "origin fetch");
        Ok(CachedResponse::new(status, content_type, body.to_vec()))
    }
}

impl AssetFetcher for HttpOrigin {
    fn fetch<'a>(&'a self, request: &'a AssetRequest) -> BoxFuture<'a, Result<CachedResponse, CacheError>> {
        self.fetch_remote(request).boxed()
    }
}

/// Serves assets from a directory. `/` and paths ending in `/` map to
/// `index.html`; a missing file is a 404 response, not an error.
#[derive(Debug, Clone)]
pub struct DirectoryOrigin {
    root: PathBuf,
}

impl DirectoryOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, request_path: &str) -> Result<PathBuf, CacheError> {
        let path = request_path.split(['?', '#']).next().unwrap_or_default();
        let mut relative = path.trim_start_matches('/').to_string();
        if relative.is_empty() || relative.ends_with('/') {
            relative.push_str("index.html");
        }

        let relative = Path::new(&relative);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(CacheError::InvalidPath(request_path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    async fn read(&self, request: &AssetRequest) -> Result<CachedResponse, CacheError> {
        if !matches!(request.method.as_str(), "GET" | "HEAD") {
            return Ok(CachedResponse::new(405, None, Vec::new()));
        }

        let file = self.resolve(&request.path)?;
        match tokio::fs::read(&file).await {
            Ok(body) => Ok(CachedResponse::new(200, Some(content_type_for(&file).to_string()), body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(CachedResponse::new(404, Some("text/plain".into()), b"not found".to_vec()))
            }
            Err(e) => Err(CacheError::Network { path: request.path.clone(), reason: e.to_string() }),
        }
    }
}

impl AssetFetcher for DirectoryOrigin {
    fn fetch<'a>(&'a self, request: &'a AssetRequest) -> BoxFuture<'a, Result<CachedResponse, CacheError>> {
        self.read(request).boxed()
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or_default() {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" => "text/javascript; charset=utf-8",
        "json" | "geojson" => "application/json",
        "webmanifest" => "application/manifest+json",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        _ => "application/octet-stream",
    }
}
