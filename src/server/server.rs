use anyhow::{Context, Result};
use std::time::Duration;

use tower_http::services::ServeDir;
use tracing::info;

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use super::album_routes::{list_albums, list_images};
use super::error::ApiError;
use super::upload_routes::{analyze, classify, upload};
use super::{log_requests, metrics, state::ServerState};
use crate::object_store::MEDIA_ROUTE_PREFIX;

#[derive(Serialize)]
struct ServerStats {
    pub status: &'static str,
    pub message: &'static str,
    pub uptime: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> Json<ServerStats> {
    Json(ServerStats {
        status: "success",
        message: "Feeling album server is running",
        uptime: format_uptime(state.start_time.elapsed()),
    })
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub fn make_app(state: ServerState) -> Router {
    let mut app: Router = Router::new()
        .route("/", get(home))
        .route("/upload", post(upload))
        .route("/classify", post(classify))
        .route("/analyze", post(analyze))
        .route("/albums", get(list_albums))
        .route("/images/{album_id}/{category}", get(list_images))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .with_state(state.clone());

    if let Some(media_dir) = &state.config.media_dir {
        app = app.nest_service(MEDIA_ROUTE_PREFIX, ServeDir::new(media_dir));
    }

    app.layer(middleware::from_fn_with_state(state, log_requests))
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Serves the API and the metrics endpoint until interrupted.
pub async fn run_server(state: ServerState) -> Result<()> {
    let port = state.config.port;
    let metrics_port = state.config.metrics_port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(("0.0.0.0", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    tokio::try_join!(
        async {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        },
        async {
            axum::serve(metrics_listener, make_metrics_app())
                .with_graceful_shutdown(shutdown_signal())
                .await
        },
    )?;

    Ok(())
}
