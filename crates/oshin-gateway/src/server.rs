//! Gateway server: router assembly and graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use oshin_core::config::ServerConfig;
use oshin_core::error::{OshinError, Result};
use oshin_engine::FanoutRouter;
use tower_http::trace::TraceLayer;

use crate::routes;

/// Shared state for every handler.
pub struct AppState {
    pub config: ServerConfig,
    pub router: Arc<FanoutRouter>,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, router: Arc<FanoutRouter>) -> Self {
        Self {
            config,
            router,
            start_time: std::time::Instant::now(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        .route("/api/v1/info", get(routes::system_info))
        .route("/on", post(routes::submit_on))
        .route("/til", post(routes::submit_til))
        .route("/done", post(routes::submit_done))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve<F>(state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port)
        .parse()
        .map_err(|e| OshinError::config(format!("Invalid listen address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🌐 Gateway listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Gateway stopped");
    Ok(())
}
