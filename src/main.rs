//! FTP HTTP bridge - Entry Point
//!
//! Exposes the operations of one configured FTP server as HTTP routes.

use log::{error, info};
use std::process;

use ftp_http_bridge::{BridgeConfig, FtpBridge, Server};

#[tokio::main]
async fn main() {
    // env_logger picks up RUST_LOG
    env_logger::init();

    let config = match BridgeConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    config.ftp.log_details();

    info!("Launching FTP bridge...");

    let bridge = FtpBridge::new(config.ftp);
    let server = match Server::bind(config.http, bridge).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            process::exit(1);
        }
    };
    server.start().await;
}
