use std::{net::SocketAddr, time::Duration};

use axum::Router;
use configs::AppConfig;
use tracing::info;

use service::{runtime, storage::RecordStore};

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

/// Build the app state and router from configuration.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    runtime::ensure_env(&cfg.storage.db_file)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    let store = RecordStore::open(&cfg.storage.db_file, cfg.storage.seed_demo_user).await;
    info!(db_file = %store.location(), degraded = store.is_degraded(), "record store ready");

    let state = AppState::new(
        store,
        cfg.geocoder.base_url.clone(),
        Duration::from_secs(cfg.geocoder.timeout_secs),
    )?;
    let cors = routes::build_cors(&cfg.server.allowed_origins);
    Ok(routes::build_router(state, cors))
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let app = build_app(&cfg).await?;

    let addr: SocketAddr = cfg
        .bind_addr()
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("{}: {}", cfg.bind_addr(), e)))?;
    info!(%addr, "starting server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received Ctrl+C, shutting down");
        })
        .await?;
    Ok(())
}
