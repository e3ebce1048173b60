use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use bumper_server::config::ServerConfig;
use bumper_server::metrics::{self, Metrics};
use bumper_server::net::transport::WebTransportServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Bumper Server v{}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load_or_default();
    config.validate()?;
    info!(
        "Configuration loaded: {}:{}, {} Hz, arena {}x{}, {} junk, {} holes, max_players={}",
        config.bind_address,
        config.port,
        config.tick_rate,
        config.arena_width,
        config.arena_height,
        config.junk_count,
        config.hole_count,
        config.max_players
    );

    let metrics = Arc::new(Metrics::new());

    let metrics_clone = metrics.clone();
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = metrics::start_metrics_server(metrics_clone, metrics_port).await {
            error!("Metrics server error: {}", e);
        }
    });

    let server = WebTransportServer::new(config, metrics).await?;
    info!("Server ready on https://{}", server.bind_addr());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut server_task = tokio::spawn(server.run(shutdown_rx));

    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received");
    };

    tokio::select! {
        result = &mut server_task => {
            match result {
                Ok(Err(e)) => error!("Server error: {}", e),
                Err(e) => error!("Server task failed: {}", e),
                Ok(Ok(())) => {}
            }
            return Ok(());
        }
        _ = ctrl_c => {
            info!("Shutting down...");
        }
    }

    // The game loop finishes its current tick before stopping
    shutdown_tx.send(true).ok();
    match server_task.await {
        Ok(Err(e)) => error!("Server error during shutdown: {}", e),
        Err(e) => error!("Server task failed: {}", e),
        Ok(Ok(())) => {}
    }

    info!("Server stopped");
    Ok(())
}
