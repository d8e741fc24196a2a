use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use board_gate::{AppState, Config, build_router, metrics, utils};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    info!("Starting Board Gate v{}", env!("CARGO_PKG_VERSION"));

    match run().await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Initialize logging. `LOG_FORMAT=json` switches to one JSON object per line.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Build the application state, attaching context for startup logs.
fn init_state(config: Config) -> anyhow::Result<AppState> {
    let sessions = config
        .sessions_file
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<none>".to_string());

    AppState::from_config(config)
        .with_context(|| format!("failed to initialize state (sessions file: {sessions})"))
}

/// Run the application, returning an exit code on error.
async fn run() -> Result<(), exitcode::ExitCode> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Configuration error: {e}");
        exitcode::CONFIG
    })?;
    info!(
        host = %config.host,
        port = %config.port,
        admins = config.admin_emails.len(),
        quota_overrides = config.quota_overrides.len(),
        api_rate_limit = config.api_rate_limit_enabled,
        "Configuration loaded"
    );

    if let Some(metrics_addr) = config.metrics_addr() {
        metrics::try_init_metrics(metrics_addr);
    } else {
        info!("Metrics disabled (METRICS_PORT=0)");
    }

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;

    // Build application state and router
    let state = init_state(config).map_err(|e| {
        error!("{e:#}");
        exitcode::CONFIG
    })?;
    let app = build_router(state.clone());

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET    /health              - Health check");
    info!("  GET    /ready               - Readiness check");
    info!("  GET    /stats               - Service statistics");
    info!("  GET    /me                  - Resolved caller");
    info!("  POST   /messages            - Post a message");
    info!("  GET    /messages            - List messages");
    info!("  DELETE /messages/{{id}}       - Delete a message");
    info!("  POST   /files?name=         - Upload a file");
    info!("  GET    /files               - List files");
    info!("  DELETE /files/{{id}}          - Delete a file");
    info!("  POST   /admin/admins        - Grant admin role");

    // Start server with graceful shutdown; /ready flips to 503 while draining
    let shutdown_state = state.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            utils::shutdown_signal().await;
            shutdown_state.begin_shutdown();
        })
        .await
        .map_err(|e| {
            error!("Server error: {e}");
            exitcode::SOFTWARE
        })?;

    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}
