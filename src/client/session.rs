//! Remote session seams
//!
//! [`Connector`] opens authenticated sessions and [`RemoteSession`] is the
//! command surface of one open session. The TCP implementation lives in
//! `client::connection`; tests plug in an in-memory remote.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::FtpConfig;
use crate::error::{ConnectFailure, Result};
use crate::protocol::Reply;
use crate::transfer::LocalFile;

/// Resolved connection target, only built when host and username are set.
#[derive(Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub connect_timeout: Option<Duration>,
}

impl Endpoint {
    pub fn from_config(config: &FtpConfig) -> std::result::Result<Self, ConnectFailure> {
        let host = config
            .host()
            .ok_or(ConnectFailure::NotConfigured("FTP_SERVER"))?;
        let username = config
            .user()
            .ok_or(ConnectFailure::NotConfigured("FTP_USERNAME"))?;

        Ok(Self {
            host: host.to_string(),
            port: config.port,
            username: username.to_string(),
            password: config.secret().to_string(),
            connect_timeout: config.connect_timeout(),
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[Hidden]")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Commands available on one open, authenticated session.
#[async_trait]
pub trait RemoteSession: Send {
    /// `STOR`: streams `local` to `remote` in binary mode.
    async fn store(&mut self, remote: &str, local: &mut LocalFile) -> Result<u64>;

    /// `RETR`: streams `remote` into `local` in binary mode.
    async fn retrieve(&mut self, remote: &str, local: &mut LocalFile) -> Result<u64>;

    /// `NLST`: names under `path`, or in the current directory.
    async fn name_list(&mut self, path: Option<&str>) -> Result<Vec<String>>;

    async fn delete(&mut self, path: &str) -> Result<()>;

    /// `RNFR` followed by `RNTO`.
    async fn rename(&mut self, from: &str, to: &str) -> Result<()>;

    async fn make_dir(&mut self, path: &str) -> Result<()>;

    async fn remove_dir(&mut self, path: &str) -> Result<()>;

    async fn size(&mut self, path: &str) -> Result<u64>;

    /// `MDTM`, returning the raw reply line.
    async fn modified_time(&mut self, path: &str) -> Result<String>;

    /// `SITE <params>`.
    async fn site(&mut self, params: &str) -> Result<Reply>;

    /// `QUIT` and release the connection.
    async fn quit(&mut self) -> Result<()>;
}

/// Opens sessions against a remote endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: RemoteSession;

    /// Connects and authenticates. Every call is a new connection.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Self::Session>;
}
