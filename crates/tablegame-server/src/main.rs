use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use tablegame_server::config::ServerConfig;
use tablegame_server::{build_app, spawn_room_janitor};

fn init_tracing(log_format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    let (config, source) = ServerConfig::load();
    init_tracing(&config.log_format);
    source.log();
    config.validate();
    let listen_addr = config.listen_addr.clone();

    let (app, state) = build_app(config);
    let shutdown = CancellationToken::new();
    spawn_room_janitor(state, shutdown.clone());

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {listen_addr}: {e}"));
    tracing::info!(addr = %listen_addr, "Tablegame server listening");

    let signal = shutdown.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
        signal.cancel();
    })
    .await
    .unwrap_or_else(|e| panic!("Server error: {e}"));
}
