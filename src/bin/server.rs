//! shoutback-server: TCP request/response server.
//!
//! Binds the configured address, serves clients until SIGINT/SIGTERM,
//! then drains in-flight connections and exits.

use std::process::ExitCode;

use shoutback::config::ServerConfig;
use shoutback::server::Server;
use shoutback::shutdown;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        "Starting shoutback server"
    );

    let mut server = Server::new(config);
    shutdown::spawn_signal_listener(server.shutdown_handle());

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}
