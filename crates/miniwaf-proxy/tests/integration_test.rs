//! Integration tests for the MiniWAF proxy

use axum::{
    body::{self, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use miniwaf_policy::RuleSet;
use miniwaf_proxy::{create_router, AppState, ProxyConfig};
use miniwaf_telemetry::{read_events, AuditConfig};
use serde_json::Value;
use tower::ServiceExt;

const RULES: &str = r#"
rules:
  - id: sqli-1
    description: SQL Injection attempt
    pattern: "union\\s+select|or\\s+1=1"
    target: [query_params, post_body]
    action: block
  - id: xss-1
    description: XSS attempt
    pattern: "<script"
    target: [query_params, post_body]
    action: log
"#;

fn config() -> ProxyConfig {
    ProxyConfig {
        audit: AuditConfig {
            enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn state_with(config: ProxyConfig, rules: &str) -> AppState {
    AppState::with_rules(config, RuleSet::from_yaml(rules).unwrap(), None).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, "localhost:5000")
        .body(Body::empty())
        .unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::HOST, "localhost:5000")
        .header(header::CONTENT_TYPE, "text/plain")
        .header(header::CONTENT_LENGTH, body.len())
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(app, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_clean_request_is_served() {
    let app = create_router(state_with(config(), RULES));

    let (status, body) = send_json(&app, get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Welcome to MiniWAF protected application");
}

#[tokio::test]
async fn test_demo_endpoints_without_upstream() {
    let app = create_router(state_with(config(), RULES));

    let (status, body) = send_json(&app, get("/test-sqli")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "SQLi test endpoint");

    let (status, body) = send_json(&app, get("/test-xss")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "XSS test endpoint");
}

#[tokio::test]
async fn test_sqli_in_query_is_blocked() {
    let state = state_with(config(), RULES);
    let app = create_router(state.clone());

    let (status, body) = send_json(&app, get("/test-sqli?id=1%20UNION%20SELECT%20password")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Request blocked by WAF");
    assert_eq!(body["rule"], "sqli-1");
    assert_eq!(body["description"], "SQL Injection attempt");

    let snapshot = state.metrics.snapshot();
    assert_eq!(snapshot.total_requests, 1);
    assert_eq!(snapshot.blocked_requests, 1);
    assert_eq!(snapshot.block_matches, 1);
}

#[tokio::test]
async fn test_xss_is_logged_but_allowed() {
    let state = state_with(config(), RULES);
    let app = create_router(state.clone());

    let (status, body) = send_json(&app, post("/test-xss", "<script>alert(1)</script>")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "XSS test endpoint");

    let snapshot = state.metrics.snapshot();
    assert_eq!(snapshot.log_matches, 1);
    assert_eq!(snapshot.blocked_requests, 0);
}

#[tokio::test]
async fn test_operational_routes_bypass_waf() {
    let block_all = r#"
rules:
  - id: deny-all
    description: Deny everything
    pattern: "."
    target: [url]
    action: block
"#;
    let app = create_router(state_with(config(), block_all));

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let (status, body) = send_json(&app, get("/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rules"], 1);

    let (status, _) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, body) = send_json(&app, get("/")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["rule"], "deny-all");
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let config = ProxyConfig {
        max_body_bytes: 64,
        ..config()
    };
    let app = create_router(state_with(config, RULES));

    let (status, _) = send(&app, post("/", &"a".repeat(128))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_unknown_path_without_upstream() {
    let app = create_router(state_with(config(), RULES));

    let (status, body) = send_json(&app, get("/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");

    // Unrouted paths are still inspected
    let (status, body) = send_json(&app, get("/missing?q=1%20or%201=1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["rule"], "sqli-1");
}

#[tokio::test]
async fn test_rule_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.yaml");
    std::fs::write(&path, RULES).unwrap();

    let config = ProxyConfig {
        rules_path: path.clone(),
        ..config()
    };
    let state = AppState::new(config, None).unwrap();
    let app = create_router(state.clone());

    let (status, _) = send(&app, get("/?cmd=cat%20/etc/passwd")).await;
    assert_eq!(status, StatusCode::OK);

    let updated = format!(
        "{}  - id: lfi-1\n    description: Sensitive file access\n    pattern: \"/etc/passwd\"\n    target: [query_params]\n    action: block\n",
        RULES
    );
    std::fs::write(&path, updated).unwrap();
    assert_eq!(state.reload_rules().unwrap(), 3);

    let (status, body) = send_json(&app, get("/?cmd=cat%20/etc/passwd")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["rule"], "lfi-1");

    // A broken file leaves the current rules in place
    std::fs::write(&path, "rules:\n  - id: bad\n    pattern: \"(\"\n").unwrap();
    assert!(state.reload_rules().is_err());
    assert_eq!(state.engine.store().len(), 3);
}

#[tokio::test]
async fn test_blocked_requests_reach_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("waf.log");
    let config = ProxyConfig {
        audit: AuditConfig {
            enabled: true,
            path: audit_path.clone(),
            ..Default::default()
        },
        ..Default::default()
    };
    let state = state_with(config, RULES);
    let app = create_router(state.clone());

    send(&app, post("/", "<script>x</script>")).await;
    send(&app, get("/?id=1%20union%20select%202")).await;
    state.shutdown();

    let events = read_events(&audit_path).unwrap();
    let ids: Vec<_> = events.iter().map(|e| e.event.rule_id.as_str()).collect();
    assert_eq!(ids, vec!["xss-1", "sqli-1"]);
    assert_eq!(events[1].event.request.method, "GET");
    assert!(events[1].event.request.url.starts_with("http://localhost:5000/"));
}

async fn echo(headers: HeaderMap, request: Request<Body>) -> String {
    let tag = headers
        .get("x-tag")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let body = body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
    format!(
        "{} {} tag={} body={}",
        method,
        uri,
        tag,
        String::from_utf8_lossy(&body)
    )
}

/// Start a local echo server and return its base URL
async fn spawn_upstream() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let upstream = Router::new().fallback(echo);
        axum::serve(listener, upstream).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_allowed_requests_forwarded_upstream() {
    let config = ProxyConfig {
        upstream_url: Some(spawn_upstream().await),
        ..config()
    };
    let app = create_router(state_with(config, RULES));

    let request = Request::builder()
        .method("POST")
        .uri("/api/items?page=2")
        .header(header::HOST, "localhost:5000")
        .header("x-tag", "blue")
        .body(Body::from("name=widget"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "POST /api/items?page=2 tag=blue body=name=widget"
    );

    // Blocked requests never reach the upstream
    let (status, _) = send(&app, get("/api/items?id=1%20UNION%20SELECT%201")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_demo_paths_forwarded_when_upstream_configured() {
    let config = ProxyConfig {
        upstream_url: Some(spawn_upstream().await),
        ..config()
    };
    let app = create_router(state_with(config, "rules: []"));

    for path in ["/", "/test-sqli", "/test-xss"] {
        let (status, body) = send(&app, get(path)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            String::from_utf8(body).unwrap(),
            format!("GET {} tag=- body=", path)
        );
    }

    // Operational routes stay local
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ProxyConfig {
        upstream_url: Some(format!("http://{}", addr)),
        ..config()
    };
    let app = create_router(state_with(config, RULES));

    let (status, body) = send_json(&app, get("/anything")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().starts_with("Upstream error"));
}
