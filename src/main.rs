// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chart_pipeline::ChartPipeline;
use crate::application::refresh_service::ChartSession;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::json_source::JsonSensorSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    health_check, latest_chart, refresh_chart, stream_chart, suspend_chart,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let app_config = load_app_config()?;
    let chart_settings = Arc::new(app_config.chart);

    // Create source (infrastructure layer)
    let source = Arc::new(JsonSensorSource::from_settings(&chart_settings));

    // Start the refresh session (application layer)
    let session = ChartSession::spawn(ChartPipeline::new(chart_settings), source);

    let state = Arc::new(AppState {
        session: session.handle(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/chart", get(latest_chart))
        .route("/chart/stream", get(stream_chart))
        .route("/chart/refresh", post(refresh_chart))
        .route("/chart/suspend", post(suspend_chart))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = app_config.server.bind_addr.parse()?;
    tracing::info!("Starting sensor-linechart service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            // Ends open chart streams so the server can drain.
            session.shutdown().await;
        })
        .await?;

    Ok(())
}
