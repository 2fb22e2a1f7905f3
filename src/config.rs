//! Configuration management for the FTP HTTP bridge
//!
//! Connection settings for the remote FTP server and the HTTP listener are
//! read once at start-up and never change afterwards.

use std::fmt;
use std::time::Duration;

use config::{Config, ConfigError, Environment, Source};
use log::{info, warn};
use serde::Deserialize;

const DEFAULT_FTP_PORT: u16 = 21;
const DEFAULT_HTTP_PORT: u16 = 5000;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Complete bridge configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub ftp: FtpConfig,
    pub http: HttpConfig,
}

/// Remote FTP server target and static credentials.
///
/// Environment: `FTP_SERVER`, `FTP_PORT`, `FTP_USERNAME`, `FTP_PASSWORD`,
/// `FTP_CONNECT_TIMEOUT_SECS`
#[derive(Deserialize, Clone)]
pub struct FtpConfig {
    #[serde(default)]
    pub server: Option<String>,

    #[serde(default = "default_ftp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Bound on establishing the TCP connection. Unset means the OS default.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
}

/// HTTP listener settings.
///
/// Environment: `BRIDGE_BIND_ADDRESS`, `BRIDGE_PORT`, `BRIDGE_MAX_BODY_BYTES`
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_http_port")]
    pub port: u16,

    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_ftp_port() -> u16 {
    DEFAULT_FTP_PORT
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

impl Default for FtpConfig {
    fn default() -> Self {
        Self {
            server: None,
            port: DEFAULT_FTP_PORT,
            username: None,
            password: None,
            connect_timeout_secs: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: DEFAULT_HTTP_PORT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn load_from<T, S>(source: S) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    S: Source + Send + Sync + 'static,
{
    Config::builder().add_source(source).build()?.try_deserialize()
}

impl BridgeConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let config = Self {
            ftp: FtpConfig::from_source(Environment::with_prefix("FTP"))?,
            http: HttpConfig::from_source(Environment::with_prefix("BRIDGE"))?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ftp.port == 0 {
            return Err(ConfigError::Message("FTP_PORT cannot be 0".into()));
        }

        if self.http.port == 0 {
            return Err(ConfigError::Message("BRIDGE_PORT cannot be 0".into()));
        }

        if self.http.max_body_bytes == 0 {
            return Err(ConfigError::Message(
                "BRIDGE_MAX_BODY_BYTES must be greater than 0".into(),
            ));
        }

        Ok(())
    }
}

impl FtpConfig {
    pub fn from_source<S: Source + Send + Sync + 'static>(source: S) -> Result<Self, ConfigError> {
        load_from(source)
    }

    /// Remote host, if set and non-empty.
    pub fn host(&self) -> Option<&str> {
        self.server.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Login name, if set and non-empty.
    pub fn user(&self) -> Option<&str> {
        self.username.as_deref().filter(|s| !s.is_empty())
    }

    /// Password, empty when unset.
    pub fn secret(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }

    /// `host:port` for logs, with a placeholder when the host is unset.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host().unwrap_or("<unset>"), self.port)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Logs the connection target at start-up.
    ///
    /// Missing host or username only warns; operations fail when invoked.
    pub fn log_details(&self) {
        if self.host().is_none() || self.user().is_none() {
            warn!("FTP_SERVER or FTP_USERNAME environment variable is not set.");
            return;
        }

        info!("FTP Server: {}", self.host().unwrap_or_default());
        info!("FTP Port: {}", self.port);
        info!("FTP Username: {}", self.user().unwrap_or_default());
        info!("FTP Password: [Hidden]");
    }
}

impl fmt::Debug for FtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[Hidden]"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl HttpConfig {
    pub fn from_source<S: Source + Send + Sync + 'static>(source: S) -> Result<Self, ConfigError> {
        load_from(source)
    }

    /// Get bind address and port as socket address
    pub fn listen_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
