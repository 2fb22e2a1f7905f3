pub mod client;
pub mod config;
pub mod error;
pub mod middleware;
pub mod operations;
pub mod protocol;
pub mod server;
pub mod transfer;

#[cfg(test)]
mod testing;

pub use config::BridgeConfig;
pub use error::{BridgeError, Result};
pub use operations::FtpBridge;
pub use server::Server;
