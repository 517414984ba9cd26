//! MiniWAF Proxy
//!
//! Runs every request through the rule engine before serving it, either
//! from the built-in demo application or from a configured upstream.

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use miniwaf_proxy::{create_router, AppState, Cli, ProxyConfig};
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    info!("Starting MiniWAF Proxy");

    let config = ProxyConfig::load(&cli)?;
    info!("Configuration loaded successfully");
    info!("Rules: {}", config.rules_path.display());
    match &config.upstream_url {
        Some(upstream) => info!("Upstream: {}", upstream),
        None => info!("No upstream configured, serving demo application"),
    }

    let metrics_handle = init_metrics()?;

    let state = AppState::new(config, Some(metrics_handle))?;
    info!("Application state initialized successfully");

    #[cfg(unix)]
    spawn_reload_handler(state.clone())?;

    let addr: SocketAddr = state.config.listen.parse()?;
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("MiniWAF listening on http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    })
    .await?;

    // The audit writer joins a thread, keep it off the runtime
    let audit_state = state.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || audit_state.shutdown()).await {
        error!("Audit shutdown failed: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Reload the rule file on SIGHUP
#[cfg(unix)]
fn spawn_reload_handler(state: AppState) -> Result<()> {
    let mut hangup = signal::unix::signal(signal::unix::SignalKind::hangup())?;

    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading rules");
            // Failures are logged by the store; the old rules stay active
            let _ = state.reload_rules();
        }
    });

    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("miniwaf=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("miniwaf=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("miniwaf_requests_total", "Total number of requests inspected");
    metrics::describe_counter!(
        "miniwaf_decisions_total",
        "Total number of inspection decisions by outcome"
    );
    metrics::describe_counter!(
        "miniwaf_rule_matches_total",
        "Total number of rule matches by rule and action"
    );
    metrics::describe_counter!(
        "miniwaf_rule_faults_total",
        "Total number of rule evaluation faults by rule"
    );
    metrics::describe_histogram!(
        "miniwaf_inspection_latency_us",
        metrics::Unit::Microseconds,
        "Inspection latency in microseconds"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
