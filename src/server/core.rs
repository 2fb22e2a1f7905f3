use log::{debug, error, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::client::{Connector, TcpConnector};
use crate::config::HttpConfig;
use crate::operations::FtpBridge;
use crate::server::request::{RequestError, read_request};
use crate::server::response::HttpResponse;
use crate::server::routes::handle_request;

pub struct Server<C = TcpConnector> {
    listener: TcpListener,
    bridge: Arc<FtpBridge<C>>,
    config: Arc<HttpConfig>,
}

impl<C> Server<C>
where
    C: Connector + 'static,
{
    pub async fn bind(config: HttpConfig, bridge: FtpBridge<C>) -> io::Result<Self> {
        let socket = config.listen_socket();
        let listener = match TcpListener::bind(&socket).await {
            Ok(listener) => {
                info!("Server bound to {}", socket);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", socket, e);
                return Err(e);
            }
        };

        Ok(Self {
            listener,
            bridge: Arc::new(bridge),
            config: Arc::new(config),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn start(&self) {
        info!(
            "Starting FTP bridge on {} (FTP server {})",
            self.config.listen_socket(),
            self.bridge.config().endpoint()
        );

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let bridge = Arc::clone(&self.bridge);
                    let config = Arc::clone(&self.config);

                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, bridge, config).await {
                            warn!("Failed to handle client {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}

/// Serves a single request on `stream`, then closes it.
async fn handle_connection<C: Connector>(
    stream: TcpStream,
    client_addr: SocketAddr,
    bridge: Arc<FtpBridge<C>>,
    config: Arc<HttpConfig>,
) -> io::Result<()> {
    let mut reader = BufReader::new(stream);

    let response = match read_request(&mut reader, config.max_body_bytes).await {
        Ok(request) => {
            debug!(
                "{} {} from {}",
                request.method().as_str(),
                request.path(),
                client_addr
            );
            handle_request(&bridge, &request).await
        }
        Err(RequestError::Closed) => return Ok(()),
        Err(RequestError::TooLarge { size, limit }) => {
            warn!("Rejected {size} byte body from {client_addr} (limit {limit})");
            HttpResponse::message(413, "Request body too large")
        }
        Err(RequestError::Malformed(reason)) => {
            warn!("Malformed request from {client_addr}: {reason}");
            HttpResponse::message(400, "Bad request")
        }
        Err(RequestError::Io(e)) => return Err(e),
    };

    let stream = reader.get_mut();
    stream.write_all(&response.to_bytes()).await?;
    stream.flush().await?;
    stream.shutdown().await
}
