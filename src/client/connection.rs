//! Module `connection`
//!
//! FTP control connection over tokio TCP, and the [`TcpConnector`] that
//! opens one per session.

use async_trait::async_trait;
use log::debug;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::client::session::{Connector, Endpoint, RemoteSession};
use crate::error::{BridgeError, ConnectFailure, Result};
use crate::protocol::{Command, Reply, TransferType, parse_name_list, parse_size, read_reply};
use crate::transfer::{
    LocalFile, PassiveMode, connect_data, data_address, receive_bytes, receive_file, send_file,
};

/// One authenticated control connection.
pub struct FtpConnection {
    control: BufReader<TcpStream>,
    peer: SocketAddr,
    passive: PassiveMode,
    transfer_type: Option<TransferType>,
}

/// Classifies a reply: 2xx passes, 4xx/5xx are rejections, the rest is
/// unexpected at this point of the exchange.
fn expect_completion(command: &Command, reply: Reply) -> Result<Reply> {
    if reply.is_completion() {
        Ok(reply)
    } else {
        Err(unexpected(command, &reply))
    }
}

fn unexpected(command: &Command, reply: &Reply) -> BridgeError {
    match reply.code() / 100 {
        4 | 5 => BridgeError::rejected(command.to_string(), reply),
        _ => BridgeError::Protocol(format!("unexpected reply to {command}: {reply}")),
    }
}

fn handshake_failure(err: BridgeError) -> ConnectFailure {
    match err {
        BridgeError::Transport(e) => ConnectFailure::Io(e),
        other => ConnectFailure::Protocol(other.to_string()),
    }
}

impl FtpConnection {
    /// Opens the control connection and reads the server greeting.
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> std::result::Result<Self, ConnectFailure> {
        let connect = TcpStream::connect((host, port));
        let stream = match timeout {
            Some(limit) => tokio::time::timeout(limit, connect)
                .await
                .map_err(|_| ConnectFailure::TimedOut(limit.as_secs()))?,
            None => connect.await,
        }
        .map_err(ConnectFailure::Io)?;

        let peer = stream.peer_addr().map_err(ConnectFailure::Io)?;
        let mut connection = Self {
            control: BufReader::new(stream),
            peer,
            passive: PassiveMode::for_peer(&peer),
            transfer_type: None,
        };

        let mut greeting = connection.read().await.map_err(handshake_failure)?;
        // 120: service ready in a few minutes
        while greeting.is_preliminary() {
            greeting = connection.read().await.map_err(handshake_failure)?;
        }
        if !greeting.is_completion() {
            return Err(ConnectFailure::Rejected(greeting));
        }
        debug!("Greeting from {peer}: {greeting}");

        Ok(connection)
    }

    /// Authenticates with `USER` and, when asked for it, `PASS`.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
    ) -> std::result::Result<(), ConnectFailure> {
        let mut reply = self
            .execute(&Command::USER(username.to_string()))
            .await
            .map_err(handshake_failure)?;

        if reply.is_intermediate() {
            reply = self
                .execute(&Command::PASS(password.to_string()))
                .await
                .map_err(handshake_failure)?;
        }

        if reply.is_completion() {
            Ok(())
        } else {
            Err(ConnectFailure::Rejected(reply))
        }
    }

    async fn read(&mut self) -> Result<Reply> {
        let reply = read_reply(&mut self.control).await?;
        debug!("<-- {reply}");
        Ok(reply)
    }

    /// Sends one command and reads its reply.
    async fn execute(&mut self, command: &Command) -> Result<Reply> {
        debug!("--> {command}");
        let stream = self.control.get_mut();
        stream.write_all(command.to_wire().as_bytes()).await?;
        stream.flush().await?;
        self.read().await
    }

    async fn execute_expecting_completion(&mut self, command: Command) -> Result<Reply> {
        let reply = self.execute(&command).await?;
        expect_completion(&command, reply)
    }

    async fn set_type(&mut self, transfer_type: TransferType) -> Result<()> {
        if self.transfer_type != Some(transfer_type) {
            self.execute_expecting_completion(Command::TYPE(transfer_type))
                .await?;
            self.transfer_type = Some(transfer_type);
        }
        Ok(())
    }

    /// Opens a passive data connection and issues `command` on it.
    async fn open_data(&mut self, command: &Command) -> Result<TcpStream> {
        let passive = self.passive.command();
        let reply = self.execute(&passive).await?;
        let reply = expect_completion(&passive, reply)?;
        let addr = data_address(self.passive, self.peer, &reply)?;
        let data = connect_data(addr).await?;

        let mut reply = self.execute(command).await?;
        if reply.is_completion() {
            reply = self.read().await?;
        }
        if !reply.is_preliminary() {
            return Err(unexpected(command, &reply));
        }
        Ok(data)
    }

    /// Reads the reply that closes a data transfer.
    async fn finish_data(&mut self, command: &Command) -> Result<Reply> {
        let reply = self.read().await?;
        expect_completion(command, reply)
    }
}

#[async_trait]
impl RemoteSession for FtpConnection {
    async fn store(&mut self, remote: &str, local: &mut LocalFile) -> Result<u64> {
        let command = Command::STOR(remote.to_string());
        self.set_type(TransferType::Binary).await?;
        let mut data = self.open_data(&command).await?;
        let sent = send_file(local, &mut data).await?;
        drop(data);
        self.finish_data(&command).await?;
        Ok(sent)
    }

    async fn retrieve(&mut self, remote: &str, local: &mut LocalFile) -> Result<u64> {
        let command = Command::RETR(remote.to_string());
        self.set_type(TransferType::Binary).await?;
        let mut data = self.open_data(&command).await?;
        let received = receive_file(&mut data, local).await?;
        drop(data);
        self.finish_data(&command).await?;
        Ok(received)
    }

    async fn name_list(&mut self, path: Option<&str>) -> Result<Vec<String>> {
        let command = Command::NLST(path.map(str::to_string));
        self.set_type(TransferType::Ascii).await?;
        let mut data = self.open_data(&command).await?;
        let listing = receive_bytes(&mut data).await?;
        drop(data);
        self.finish_data(&command).await?;
        Ok(parse_name_list(&listing))
    }

    async fn delete(&mut self, path: &str) -> Result<()> {
        self.execute_expecting_completion(Command::DELE(path.to_string()))
            .await?;
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let command = Command::RNFR(from.to_string());
        let reply = self.execute(&command).await?;
        if !reply.is_intermediate() {
            return Err(unexpected(&command, &reply));
        }
        self.execute_expecting_completion(Command::RNTO(to.to_string()))
            .await?;
        Ok(())
    }

    async fn make_dir(&mut self, path: &str) -> Result<()> {
        self.execute_expecting_completion(Command::MKD(path.to_string()))
            .await?;
        Ok(())
    }

    async fn remove_dir(&mut self, path: &str) -> Result<()> {
        self.execute_expecting_completion(Command::RMD(path.to_string()))
            .await?;
        Ok(())
    }

    async fn size(&mut self, path: &str) -> Result<u64> {
        let reply = self
            .execute_expecting_completion(Command::SIZE(path.to_string()))
            .await?;
        parse_size(&reply)
    }

    async fn modified_time(&mut self, path: &str) -> Result<String> {
        let reply = self
            .execute_expecting_completion(Command::MDTM(path.to_string()))
            .await?;
        Ok(reply.line())
    }

    async fn site(&mut self, params: &str) -> Result<Reply> {
        self.execute_expecting_completion(Command::SITE(params.to_string()))
            .await
    }

    async fn quit(&mut self) -> Result<()> {
        let result = self.execute_expecting_completion(Command::QUIT).await;
        let shutdown = self.control.get_mut().shutdown().await;
        result?;
        shutdown?;
        Ok(())
    }
}

/// Opens sessions over plain TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Session = FtpConnection;

    async fn connect(&self, endpoint: &Endpoint) -> Result<FtpConnection> {
        let failed = |cause| BridgeError::Connection {
            endpoint: endpoint.address(),
            cause,
        };

        let mut connection =
            FtpConnection::connect(&endpoint.host, endpoint.port, endpoint.connect_timeout)
                .await
                .map_err(failed)?;
        connection
            .login(&endpoint.username, &endpoint.password)
            .await
            .map_err(failed)?;

        Ok(connection)
    }
}
