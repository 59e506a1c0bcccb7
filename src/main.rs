//! file-relay server
//!
//! Hosts the gRPC file API and an HTTP liveness endpoint until SIGINT or
//! SIGTERM arrives.

use clap::Parser;
use tracing::{error, info};

use file_relay::{logging, Server, ServerArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = ServerArgs::parse();
    logging::init(&args.log_level);

    let config = match args.server_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting file-relay");
    info!("HTTP: {}", config.http_address);
    info!("gRPC: {}", config.grpc_address);
    info!("TLS: {}", if config.tls.is_some() { "enabled" } else { "disabled" });
    info!("Health service name: {}", config.service_name);

    Server::new(config).run().await?;
    Ok(())
}
