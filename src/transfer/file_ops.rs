//! Module `file_ops`
//!
//! Streams bytes between local files and FTP data connections. Local-side
//! failures surface as `LocalIo`, data-connection failures as `Transport`.

use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{BridgeError, Result};

const BUFFER_SIZE: usize = 8192; // 8KB buffer

/// A local file taking part in a transfer, remembered with its path for
/// error reporting.
#[derive(Debug)]
pub struct LocalFile {
    path: PathBuf,
    file: File,
}

impl LocalFile {
    /// Opens an existing file for reading.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match File::open(&path).await {
            Ok(file) => Ok(Self { path, file }),
            Err(e) => Err(BridgeError::local_io(path, e)),
        }
    }

    /// Creates the file, truncating any existing content.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match File::create(&path).await {
            Ok(file) => Ok(Self { path, file }),
            Err(e) => Err(BridgeError::local_io(path, e)),
        }
    }

    /// Reads the whole remaining file.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut content = Vec::new();
        self.file
            .read_to_end(&mut content)
            .await
            .map_err(|e| BridgeError::local_io(&self.path, e))?;
        Ok(content)
    }

    /// Writes `bytes` and flushes them to disk.
    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .await
            .map_err(|e| BridgeError::local_io(&self.path, e))?;
        self.file
            .flush()
            .await
            .map_err(|e| BridgeError::local_io(&self.path, e))
    }
}

/// Sends the content of `local` over a data connection and closes the
/// write side so the server sees end-of-file.
pub async fn send_file<W>(local: &mut LocalFile, data: &mut W) -> Result<u64>
where
    W: AsyncWrite + Unpin,
{
    info!("Starting upload from {}", local.path.display());

    let mut buffer = [0; BUFFER_SIZE];
    let mut total_bytes_sent = 0u64;

    loop {
        let n = local
            .file
            .read(&mut buffer)
            .await
            .map_err(|e| BridgeError::local_io(&local.path, e))?;
        if n == 0 {
            break;
        }
        data.write_all(&buffer[..n]).await?;
        total_bytes_sent += n as u64;
    }

    data.flush().await?;
    data.shutdown().await?;

    debug!(
        "Sent {total_bytes_sent} bytes from {}",
        local.path.display()
    );
    Ok(total_bytes_sent)
}

/// Writes everything arriving on a data connection into `local`.
pub async fn receive_file<R>(data: &mut R, local: &mut LocalFile) -> Result<u64>
where
    R: AsyncRead + Unpin,
{
    info!("Starting download into {}", local.path.display());

    let mut buffer = [0; BUFFER_SIZE];
    let mut total_bytes_received = 0u64;

    loop {
        let n = data.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        local
            .file
            .write_all(&buffer[..n])
            .await
            .map_err(|e| BridgeError::local_io(&local.path, e))?;
        total_bytes_received += n as u64;
    }

    local
        .file
        .flush()
        .await
        .map_err(|e| BridgeError::local_io(&local.path, e))?;

    debug!(
        "Received {total_bytes_received} bytes into {}",
        local.path.display()
    );
    Ok(total_bytes_received)
}

/// Collects a whole data transfer in memory, used for listings.
pub async fn receive_bytes<R>(data: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut content = Vec::new();
    data.read_to_end(&mut content).await?;
    Ok(content)
}
