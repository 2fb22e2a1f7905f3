//! FTP client side of the bridge
//!
//! Control connection, session seams and the session lifecycle manager.

pub mod connection;
pub mod manager;
pub mod session;

pub use connection::{FtpConnection, TcpConnector};
pub use manager::{Session, SessionManager};
pub use session::{Connector, Endpoint, RemoteSession};
