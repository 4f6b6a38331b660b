/**
 * HAZARDLITE SERVER - Point d'entrée du démonstrateur d'aléa inondation
 *
 * RÔLE : Orchestration : config, zones, géocodage, cache d'assets, HTTP.
 * Bootstrap complet avec logs structurés (tracing).
 *
 * DÉMARRAGE : install du cache (génération courante) puis activate (purge des
 * anciennes générations). Un install raté n'active rien : la génération
 * précédente continue de servir, le reste passe par le réseau.
 */

mod config;
mod health;
mod http;
mod state;

use crate::config::load_config;
use crate::state::AppState;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hazardlite_core=debug,hazardlite_server=debug")),
        )
        .init();

    let cfg = load_config().await;
    let app_state = AppState::from_config(&cfg).context("failed to build application state")?;

    app_state.prepare_cache().await;

    let app = http::build_router(app_state);

    let addr: SocketAddr = cfg
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cfg.server.bind))?;
    let listener = TcpListener::bind(addr).await.with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await.context("http server stopped")?;
    Ok(())
}
