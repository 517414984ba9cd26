//! HTTP routes and handlers

use axum::{
    body,
    extract::{Request, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::middleware::waf_layer;
use crate::proxy::{self, AppError, AppState};

/// Build the router.
///
/// Without an upstream the demo application answers `/`, `/test-sqli` and
/// `/test-xss`; with one, every application path is forwarded. Either way
/// application paths sit behind the WAF and `/health`, `/metrics` and
/// `/stats` do not.
pub fn create_router(state: AppState) -> Router {
    let application = if state.config.upstream_url.is_none() {
        Router::new()
            .route("/", get(index).post(index))
            .route("/test-sqli", get(test_sqli).post(test_sqli))
            .route("/test-xss", get(test_xss).post(test_xss))
    } else {
        Router::new()
    };

    let protected = application
        .fallback(fallback)
        .layer(middleware::from_fn_with_state(state.clone(), waf_layer));

    let operational = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/stats", get(stats));

    operational
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    let snapshot = state.metrics.snapshot();
    Json(json!({
        "rules": state.engine.store().len(),
        "total_requests": snapshot.total_requests,
        "blocked_requests": snapshot.blocked_requests,
        "log_matches": snapshot.log_matches,
        "block_matches": snapshot.block_matches,
        "avg_latency_us": snapshot.avg_latency_us(),
        "block_rate": snapshot.block_rate(),
    }))
    .into_response()
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Welcome to MiniWAF protected application",
    }))
}

async fn test_sqli() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "SQLi test endpoint",
    }))
}

async fn test_xss() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "XSS test endpoint",
    }))
}

/// Forward to the upstream if there is one, otherwise `404`
async fn fallback(State(state): State<AppState>, request: Request) -> Result<Response, AppError> {
    let Some(upstream) = state.config.upstream_url.clone() else {
        return Ok((StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response());
    };

    let (parts, body) = request.into_parts();
    let bytes = body::to_bytes(body, state.config.max_body_bytes)
        .await
        .map_err(|_| AppError::PayloadTooLarge(state.config.max_body_bytes))?;

    proxy::forward_upstream(
        &state,
        &upstream,
        parts.method,
        &parts.uri,
        &parts.headers,
        bytes,
    )
    .await
}

