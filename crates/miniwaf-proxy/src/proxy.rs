//! Core proxy logic

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use metrics_exporter_prometheus::PrometheusHandle;
use miniwaf_core::{EventSink, SinkSet};
use miniwaf_policy::{InspectionEngine, RuleSet, RuleStore};
use miniwaf_telemetry::{AuditService, MetricsCollector, TracingSink};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ProxyConfig;

/// Application state shared across all requests
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<ProxyConfig>,

    /// Inspection engine over the live rule store
    pub engine: Arc<InspectionEngine>,

    /// Request and match counters
    pub metrics: MetricsCollector,

    /// Prometheus handle for rendering, absent when no recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,

    /// Audit log writer
    pub audit: Option<Arc<AuditService>>,

    /// HTTP client for upstream requests
    pub http_client: reqwest::Client,
}

impl AppState {
    /// Load rules from the configured file and build the application state
    pub fn new(config: ProxyConfig, metrics_handle: Option<PrometheusHandle>) -> Result<Self> {
        info!("Loading rules from: {}", config.rules_path.display());
        let rules = RuleSet::load_with(&config.rules_path, &config.engine)
            .with_context(|| format!("Failed to load rules from {}", config.rules_path.display()))?;
        info!("Loaded {} rules", rules.len());

        Self::with_rules(config, rules, metrics_handle)
    }

    /// Build the application state around an already loaded rule set
    pub fn with_rules(
        config: ProxyConfig,
        rules: RuleSet,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Result<Self> {
        let metrics = MetricsCollector::new();

        let audit = if config.audit.enabled {
            let service = AuditService::new(config.audit.clone()).with_context(|| {
                format!("Failed to open audit log {}", config.audit.path.display())
            })?;
            Some(Arc::new(service))
        } else {
            info!("Audit log disabled");
            None
        };

        let mut sinks = SinkSet::new()
            .with(Arc::new(TracingSink))
            .with(Arc::new(metrics.clone()));
        if let Some(audit) = &audit {
            sinks.push(Arc::clone(audit) as Arc<dyn EventSink>);
        }

        let engine = InspectionEngine::with_store(RuleStore::new(rules))
            .with_config(config.engine.clone())
            .with_sink(Arc::new(sinks));

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
            metrics,
            metrics_handle,
            audit,
            http_client,
        })
    }

    /// Re-read the rule file. On failure the current rules stay active.
    pub fn reload_rules(&self) -> miniwaf_core::Result<usize> {
        self.engine
            .store()
            .reload(&self.config.rules_path, &self.config.engine)
    }

    /// Drain the audit log. Blocks until pending events are on disk.
    pub fn shutdown(&self) {
        if let Some(audit) = &self.audit {
            audit.shutdown();
        }
    }
}

/// Headers that describe a single hop and must not be forwarded
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Forward an allowed request to the upstream application
pub async fn forward_upstream(
    state: &AppState,
    upstream: &str,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let url = format!("{}{}", upstream.trim_end_matches('/'), path);
    debug!("Forwarding {} {}", method, url);

    let mut request = state.http_client.request(method, &url).body(body);
    for (name, value) in headers {
        if !is_hop_by_hop(name.as_str()) {
            request = request.header(name, value);
        }
    }

    let upstream_response = request.send().await?;
    let status = upstream_response.status();

    let mut builder = Response::builder().status(status);
    for (name, value) in upstream_response.headers() {
        if !is_hop_by_hop(name.as_str()) {
            builder = builder.header(name, value);
        }
    }

    let bytes = upstream_response.bytes().await?;
    builder
        .body(Body::from(bytes))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Errors returned to HTTP clients
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }

        let mut response = (status, Json(json!({ "error": self.to_string() }))).into_response();
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        );
        response
    }
}
