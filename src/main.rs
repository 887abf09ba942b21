//! driveshare - Entry Point
//!
//! HTTP file browser for a mounted shared drive.

use log::{error, info};
use std::sync::Arc;

use driveshare::Server;
use driveshare::config::ServerConfig;
use driveshare::mount::{MountManager, SystemMounter};

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching driveshare server...");

    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mounter = Arc::new(SystemMounter::new(&config));
    let mount = MountManager::new(mounter, config.mount_timeout());

    let server = match Server::bind(config, mount).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Fire-and-forget: startup proceeds whether or not the volume attaches.
    server.spawn_startup_mount();

    server.start().await;
}
