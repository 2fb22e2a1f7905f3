//! Module `data_channel`
//!
//! Passive-mode data connections. The bridge always connects to the server:
//! `PASV` over IPv4, `EPSV` over IPv6.

use log::debug;
use std::net::{SocketAddr, SocketAddrV4};
use tokio::net::TcpStream;

use crate::error::{BridgeError, Result};
use crate::protocol::responses::{ENTERING_EXTENDED_PASSIVE, ENTERING_PASSIVE};
use crate::protocol::{Command, Reply, parse_epsv, parse_pasv};

/// Which passive command a control connection uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassiveMode {
    Pasv,
    Epsv,
}

impl PassiveMode {
    /// Picks the passive command for the control connection's peer.
    pub fn for_peer(peer: &SocketAddr) -> Self {
        match peer {
            SocketAddr::V4(_) => PassiveMode::Pasv,
            SocketAddr::V6(_) => PassiveMode::Epsv,
        }
    }

    pub fn command(&self) -> Command {
        match self {
            PassiveMode::Pasv => Command::PASV,
            PassiveMode::Epsv => Command::EPSV,
        }
    }

    fn reply_code(&self) -> u16 {
        match self {
            PassiveMode::Pasv => ENTERING_PASSIVE,
            PassiveMode::Epsv => ENTERING_EXTENDED_PASSIVE,
        }
    }
}

/// Resolves where to open the data connection.
///
/// Only the port of a `227` reply is used; the host advertised by the server
/// is replaced with the control connection's peer.
pub fn data_address(mode: PassiveMode, peer: SocketAddr, reply: &Reply) -> Result<SocketAddr> {
    if reply.code() != mode.reply_code() {
        return Err(BridgeError::Protocol(format!(
            "unexpected reply to {}: {reply}",
            mode.command()
        )));
    }
    let port = match mode {
        PassiveMode::Pasv => {
            let advertised: SocketAddrV4 = parse_pasv(reply)?;
            if *advertised.ip() != peer.ip() {
                debug!(
                    "Ignoring PASV host {}, using control peer {}",
                    advertised.ip(),
                    peer.ip()
                );
            }
            advertised.port()
        }
        PassiveMode::Epsv => parse_epsv(reply)?,
    };
    Ok(SocketAddr::new(peer.ip(), port))
}

/// Connects the data channel.
pub async fn connect_data(addr: SocketAddr) -> Result<TcpStream> {
    debug!("Opening data connection to {addr}");
    Ok(TcpStream::connect(addr).await?)
}
