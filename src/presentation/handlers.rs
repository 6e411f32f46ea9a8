// HTTP request handlers
use crate::infrastructure::chunked_json::stream_from_watch;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Latest chart snapshot
pub async fn latest_chart(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let snapshot = state.session.latest();
    match json_response(snapshot.as_ref(), accepts_brotli(&headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Stream every refresh result as newline-delimited JSON
pub async fn stream_chart(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    stream_from_watch(state.session.subscribe())
}

/// Caller-initiated resume: refresh now and restart the timer
pub async fn refresh_chart(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.session.resume() {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::warn!("Refresh rejected: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Pause periodic refreshes until the next resume
pub async fn suspend_chart(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.session.suspend() {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            tracing::warn!("Suspend rejected: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
