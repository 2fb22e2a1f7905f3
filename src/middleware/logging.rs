//! Logging middleware
//!
//! Session and operation events are emitted to an [`EventSink`] handed to
//! the session manager and the façade. [`LogSink`] forwards them to the `log`
//! facade; tests swap in a recording sink.

use log::{error, info, warn};

use crate::operations::Operation;

/// Something worth logging happened during an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    Connecting { endpoint: String },
    Connected { endpoint: String },
    ConnectFailed { endpoint: String, error: String },
    Closing,
    Closed,
    /// Teardown failed; logged only, never escalated.
    CloseFailed { error: String },
    Completed { operation: Operation, detail: String },
    Failed { operation: Operation, error: String },
}

/// Receives bridge events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: BridgeEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::Connecting { endpoint } => {
                info!("Connecting to FTP server at {endpoint}")
            }
            BridgeEvent::Connected { endpoint } => info!("Connected to FTP server {endpoint}"),
            BridgeEvent::ConnectFailed { endpoint, error } => {
                error!("Failed to connect to FTP server {endpoint}: {error}")
            }
            BridgeEvent::Closing => info!("Closing FTP connection"),
            BridgeEvent::Closed => info!("FTP connection closed"),
            BridgeEvent::CloseFailed { error } => {
                warn!("Failed to close FTP connection: {error}")
            }
            BridgeEvent::Completed { operation, detail } => info!("[{operation}] {detail}"),
            BridgeEvent::Failed { operation, error } => error!("[{operation}] failed: {error}"),
        }
    }
}
