//! HTTP server for the agent gateway dashboard.

use std::net::SocketAddr;

use dashboard_runtime::api::{DashboardState, dashboard_router};
use dashboard_runtime::{DashboardConfig, DeploymentMode};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_log();

    let config = DashboardConfig::from_env();
    let addr = SocketAddr::from((config.bind_addr, config.port));

    info!("Gateway: {}", config.gateway_url);
    match config.mode {
        DeploymentMode::Local => info!("Workspace: {}", config.workspace.display()),
        DeploymentMode::Hosted => info!("Hosted mode: workspace routes disabled"),
    }
    if config.gateway_token.is_empty() {
        warn!("GATEWAY_TOKEN is not set; gateway calls are sent without authorization");
    }
    if config.api_token.is_some() {
        info!("Dashboard API token required on /api routes");
    }
    if config.is_production() {
        info!("Serving static files from {}", config.static_dir.display());
    }

    let router = dashboard_router(DashboardState::new(config)?);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Dashboard API listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Dashboard API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}

fn setup_log() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    if tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .is_err()
    {}
}
