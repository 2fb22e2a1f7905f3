//! Error types
//!
//! Defines the error taxonomy shared by the session manager, the operation
//! façade and the HTTP layer.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::operations::RenameProgress;
use crate::protocol::Reply;

/// Why a session could not be opened.
#[derive(Debug, Error)]
pub enum ConnectFailure {
    /// A required connection setting is absent.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Io(#[source] io::Error),

    #[error("connect timed out after {0}s")]
    TimedOut(u64),

    /// The server refused the greeting or the credentials.
    #[error("server refused the session: {0}")]
    Rejected(Reply),

    #[error("{0}")]
    Protocol(String),
}

/// Errors surfaced by bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Transport connect or authentication failure.
    #[error("Failed to connect to FTP server at {endpoint}: {cause}")]
    Connection {
        endpoint: String,
        #[source]
        cause: ConnectFailure,
    },

    /// The remote server rejected a command.
    #[error("{command} rejected: {code} {message}")]
    RemoteCommand {
        command: String,
        code: u16,
        message: String,
    },

    #[error("Local file error on {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Control or data channel failure after the session was opened.
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A directory rename stopped partway through; no rollback was attempted.
    #[error("Directory rename {old} -> {new} stopped after {progress}: {source}")]
    DirectoryRename {
        old: String,
        new: String,
        progress: RenameProgress,
        #[source]
        source: Box<BridgeError>,
    },
}

impl BridgeError {
    /// Builds a `RemoteCommand` error from a rejected reply.
    pub fn rejected(command: impl Into<String>, reply: &Reply) -> Self {
        BridgeError::RemoteCommand {
            command: command.into(),
            code: reply.code(),
            message: reply.text().to_string(),
        }
    }

    pub fn local_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        BridgeError::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// Returns true when the session could not be opened at all.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, BridgeError::Connection { .. })
    }

    /// Returns true for 4xx/5xx replies to a command.
    pub fn is_remote_rejection(&self) -> bool {
        matches!(self, BridgeError::RemoteCommand { .. })
    }
}
