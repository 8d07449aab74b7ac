//! Router construction and server startup.

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use super::handlers;
use crate::config::{AnalysisConfig, Config, ServerConfig};

/// Shared by every handler. Holds no per-request pipeline state.
#[derive(Clone)]
pub struct AppContext {
    pub analysis: Arc<AnalysisConfig>,
    /// Caps concurrent analyses; permits are held by the blocking worker
    pub jobs: Arc<Semaphore>,
    pub request_timeout: Duration,
}

impl AppContext {
    pub fn new(analysis: AnalysisConfig, server: &ServerConfig) -> Self {
        Self {
            analysis: Arc::new(analysis),
            jobs: Arc::new(Semaphore::new(server.max_concurrent_jobs.max(1))),
            request_timeout: Duration::from_secs(server.request_timeout_secs),
        }
    }
}

pub fn build_router(ctx: AppContext, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/upload", get(handlers::upload_hint).post(handlers::upload))
        .fallback(handlers::not_found)
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors_layer(&server.allowed_origins))
        .layer(middleware::from_fn(handlers::options_no_content))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

/// Runs the HTTP server until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    config.analysis.validate()?;

    let ctx = AppContext::new(config.analysis, &config.server);
    let app = build_router(ctx, &config.server);

    let addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    log::info!(
        "Listening on {} (max {} concurrent jobs, {}s timeout)",
        addr,
        config.server.max_concurrent_jobs,
        config.server.request_timeout_secs
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
