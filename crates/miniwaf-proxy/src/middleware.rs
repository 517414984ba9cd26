//! WAF middleware
//!
//! Buffers the request body, runs the inspection engine and either answers
//! with `403` or hands the request (body re-attached) to the next service.

use axum::{
    body::{self, Body},
    extract::{ConnectInfo, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use miniwaf_core::HttpRequest;
use miniwaf_policy::Decision;
use serde_json::json;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::debug;

use crate::proxy::{AppError, AppState};

/// Inspect every request before it reaches a handler
pub async fn waf_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let limit = state.config.max_body_bytes;

    if let Some(length) = content_length(&request) {
        if length > limit {
            return Err(AppError::PayloadTooLarge(limit));
        }
    }

    let (parts, body) = request.into_parts();
    let bytes = body::to_bytes(body, limit)
        .await
        .map_err(|_| AppError::PayloadTooLarge(limit))?;

    let inspectable = to_inspectable(&parts, &bytes);

    let start = Instant::now();
    let decision = state.engine.inspect(&inspectable);
    let latency_us = start.elapsed().as_micros() as u64;

    state.metrics.record_inspection(!decision.is_allowed(), latency_us);

    match decision {
        Decision::Block(event) => Ok(blocked_response(&event.rule_id, &event.description)),
        Decision::Allow => {
            debug!(url = %inspectable.url, latency_us, "Request allowed");
            let request = Request::from_parts(parts, Body::from(bytes));
            Ok(next.run(request).await)
        }
    }
}

/// The `403` answer for a blocked request
pub fn blocked_response(rule_id: &str, description: &str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({
            "error": "Request blocked by WAF",
            "rule": rule_id,
            "description": description,
        })),
    )
        .into_response()
}

fn content_length(request: &Request) -> Option<usize> {
    request
        .headers()
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

/// Build the engine's view of the request
fn to_inspectable(parts: &Parts, body: &[u8]) -> HttpRequest {
    let mut request = HttpRequest::new(parts.method.as_str(), full_url(parts)).with_body(body);

    if let Some(ConnectInfo(addr)) = parts.extensions.get::<ConnectInfo<SocketAddr>>() {
        request = request.with_remote_addr(addr.ip().to_string());
    }

    for (name, value) in &parts.headers {
        request = request.with_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
    }

    request
}

/// Absolute URL from the `Host` header and request target
fn full_url(parts: &Parts) -> String {
    if parts.uri.scheme().is_some() {
        return parts.uri.to_string();
    }

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| parts.uri.authority().map(|a| a.as_str()));

    match host {
        Some(host) => format!("http://{}{}", host, path),
        None => path.to_string(),
    }
}
