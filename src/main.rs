//! SAMSIM Bridge Server
//!
//! Bridges DCS World and the browser interface: UDP telemetry in,
//! WebSocket pushes and HTTP queries out.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use samsim_bridge::{BridgeConfig, BridgeServer, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = BridgeConfig::default();

    info!("SAMSIM Bridge v{}", VERSION);
    info!("HTTP server:      http://localhost:{}", config.http_port);
    info!("WebSocket server: ws://localhost:{}", config.ws_port);
    info!("DCS receive port: {}", config.sim_recv_port);
    info!("DCS send port:    {}", config.sim_send_port);

    let server = Arc::new(BridgeServer::new(config).await?);

    let signal_server = server.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            signal_server.shutdown();
        }
    });

    server.run().await?;
    info!("Bridge stopped");
    Ok(())
}
