//! Runs the coordinate transformation API and its health checks.

use clap::Parser;
use geotransform_server::app::{health_router, router, AppState};
use geotransform_server::config::Settings;
use log::{error, info};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    env_logger::Builder::new()
        .filter_level(settings.log_level)
        .parse_default_env()
        .init();

    let state = AppState::new(&settings);

    let api_addr = settings.api_addr()?;
    let health_addr = settings.health_addr()?;
    let api_listener = TcpListener::bind(api_addr).await?;
    let health_listener = TcpListener::bind(health_addr).await?;
    info!("Serving the API on {api_addr} and the health checks on {health_addr}");

    let api = axum::serve(api_listener, router(state.clone(), &settings)).with_graceful_shutdown(shutdown_signal());
    let health = axum::serve(health_listener, health_router(state)).with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(async { api.await }, async { health.await })?;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for the shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
