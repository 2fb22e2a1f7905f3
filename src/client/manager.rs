//! Session lifecycle
//!
//! A [`Session`] goes `Unopened -> Open -> Closed` exactly once. The manager
//! opens it from the shared configuration and closes it by value, so a
//! closed session cannot be used again.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::client::session::{Connector, Endpoint, RemoteSession};
use crate::config::FtpConfig;
use crate::error::{BridgeError, ConnectFailure, Result};
use crate::middleware::{BridgeEvent, EventSink};

/// An open, authenticated session.
pub struct Session<S> {
    remote: S,
    endpoint: String,
}

impl<S> Session<S> {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<S> Deref for Session<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.remote
    }
}

impl<S> DerefMut for Session<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.remote
    }
}

/// Anything that went wrong before the session was open is a connection
/// failure.
fn connection_error(endpoint: &str, err: BridgeError) -> BridgeError {
    let cause = match err {
        BridgeError::Connection { .. } => return err,
        BridgeError::Transport(e) => ConnectFailure::Io(e),
        other => ConnectFailure::Protocol(other.to_string()),
    };
    BridgeError::Connection {
        endpoint: endpoint.to_string(),
        cause,
    }
}

/// Opens and closes sessions. Holds no session state between calls.
pub struct SessionManager<C> {
    config: Arc<FtpConfig>,
    connector: C,
    events: Arc<dyn EventSink>,
}

impl<C: Connector> SessionManager<C> {
    pub fn new(config: Arc<FtpConfig>, connector: C, events: Arc<dyn EventSink>) -> Self {
        Self {
            config,
            connector,
            events,
        }
    }

    pub fn config(&self) -> &FtpConfig {
        &self.config
    }

    /// Connects and authenticates a fresh session. No retry.
    pub async fn open_session(&self) -> Result<Session<C::Session>> {
        let endpoint = self.config.endpoint();
        self.events.emit(BridgeEvent::Connecting {
            endpoint: endpoint.clone(),
        });

        let opened = match Endpoint::from_config(&self.config) {
            Ok(target) => self
                .connector
                .connect(&target)
                .await
                .map_err(|e| connection_error(&endpoint, e)),
            Err(cause) => Err(BridgeError::Connection {
                endpoint: endpoint.clone(),
                cause,
            }),
        };

        match opened {
            Ok(remote) => {
                self.events.emit(BridgeEvent::Connected {
                    endpoint: endpoint.clone(),
                });
                Ok(Session { remote, endpoint })
            }
            Err(e) => {
                self.events.emit(BridgeEvent::ConnectFailed {
                    endpoint,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Sends `QUIT` and reports whether the session closed cleanly.
    pub async fn try_close(&self, mut session: Session<C::Session>) -> Result<()> {
        self.events.emit(BridgeEvent::Closing);
        match session.remote.quit().await {
            Ok(()) => {
                self.events.emit(BridgeEvent::Closed);
                Ok(())
            }
            Err(e) => {
                self.events.emit(BridgeEvent::CloseFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Closes the session; a teardown failure is logged and dropped.
    pub async fn close_session(&self, session: Session<C::Session>) {
        let _ = self.try_close(session).await;
    }
}
