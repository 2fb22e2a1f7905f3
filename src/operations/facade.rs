//! Operation façade
//!
//! Every public method follows the same shape: open a session, issue the
//! remote commands, close the session whatever happened, then report the
//! outcome to the event sink and return it.

use std::path::Path;
use std::sync::Arc;

use crate::client::{Connector, RemoteSession, Session, SessionManager, TcpConnector};
use crate::config::FtpConfig;
use crate::error::{BridgeError, Result};
use crate::middleware::{BridgeEvent, EventSink, LogSink};
use crate::operations::{GlobFilter, Operation, RenameProgress};
use crate::transfer::LocalFile;

/// Named FTP operations, one session each.
pub struct FtpBridge<C = TcpConnector> {
    sessions: SessionManager<C>,
    events: Arc<dyn EventSink>,
}

impl FtpBridge<TcpConnector> {
    /// TCP sessions, events logged through `log`.
    pub fn new(config: FtpConfig) -> Self {
        Self::with_parts(Arc::new(config), TcpConnector, Arc::new(LogSink))
    }
}

impl<C: Connector> FtpBridge<C> {
    pub fn with_parts(config: Arc<FtpConfig>, connector: C, events: Arc<dyn EventSink>) -> Self {
        Self {
            sessions: SessionManager::new(config, connector, Arc::clone(&events)),
            events,
        }
    }

    pub fn config(&self) -> &FtpConfig {
        self.sessions.config()
    }

    async fn begin(&self, operation: Operation) -> Result<Session<C::Session>> {
        self.sessions
            .open_session()
            .await
            .map_err(|e| self.failed(operation, e))
    }

    fn failed(&self, operation: Operation, error: BridgeError) -> BridgeError {
        self.events.emit(BridgeEvent::Failed {
            operation,
            error: error.to_string(),
        });
        error
    }

    /// Closes the session, then reports `result`.
    async fn finish<T>(
        &self,
        operation: Operation,
        session: Session<C::Session>,
        result: Result<T>,
        detail: impl FnOnce(&T) -> String,
    ) -> Result<T> {
        self.sessions.close_session(session).await;
        match result {
            Ok(value) => {
                self.events.emit(BridgeEvent::Completed {
                    operation,
                    detail: detail(&value),
                });
                Ok(value)
            }
            Err(e) => Err(self.failed(operation, e)),
        }
    }

    /// Uploads a local file to `remote`. Whatever the server does with an
    /// existing file at `remote` applies.
    pub async fn upload_file(&self, local: &Path, remote: &str) -> Result<()> {
        let operation = Operation::Upload;
        let mut session = self.begin(operation).await?;
        let result = upload(&mut *session, local, remote).await;
        self.finish(operation, session, result, |bytes| {
            format!(
                "Uploaded {} to {remote} ({bytes} bytes)",
                local.display()
            )
        })
        .await
        .map(|_| ())
    }

    /// Downloads `remote` into a local file.
    ///
    /// The local file is created (or truncated) before the transfer starts,
    /// so a failed transfer can leave it empty or partial.
    pub async fn download_file(&self, remote: &str, local: &Path) -> Result<()> {
        let operation = Operation::Download;
        let mut session = self.begin(operation).await?;
        let result = download(&mut *session, remote, local).await;
        self.finish(operation, session, result, |bytes| {
            format!(
                "Downloaded {remote} to {} ({bytes} bytes)",
                local.display()
            )
        })
        .await
        .map(|_| ())
    }

    /// Names under `path`, in the order the server sent them.
    pub async fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        let operation = Operation::ListDirectory;
        let mut session = self.begin(operation).await?;
        let result = session.name_list(Some(path)).await;
        self.finish(operation, session, result, |files| {
            format!("Listed files in {path}: {files:?}")
        })
        .await
    }

    pub async fn delete_file(&self, path: &str) -> Result<()> {
        let operation = Operation::DeleteFile;
        let mut session = self.begin(operation).await?;
        let result = session.delete(path).await;
        self.finish(operation, session, result, |_| {
            format!("File {path} deleted successfully")
        })
        .await
    }

    /// Single remote rename; atomicity is up to the server.
    pub async fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()> {
        let operation = Operation::RenameFile;
        let mut session = self.begin(operation).await?;
        let result = session.rename(old_path, new_path).await;
        self.finish(operation, session, result, |_| {
            format!("File renamed/moved from {old_path} to {new_path}")
        })
        .await
    }

    pub async fn create_directory(&self, path: &str) -> Result<()> {
        let operation = Operation::CreateDirectory;
        let mut session = self.begin(operation).await?;
        let result = session.make_dir(path).await;
        self.finish(operation, session, result, |_| {
            format!("Directory {path} created successfully")
        })
        .await
    }

    pub async fn remove_directory(&self, path: &str) -> Result<()> {
        let operation = Operation::RemoveDirectory;
        let mut session = self.begin(operation).await?;
        let result = session.remove_dir(path).await;
        self.finish(operation, session, result, |_| {
            format!("Directory {path} removed successfully")
        })
        .await
    }

    /// Moves every entry of `old_path` into a new `new_path` directory, then
    /// removes `old_path`.
    ///
    /// Not atomic. A failing step stops the sequence where it is and the
    /// returned [`BridgeError::DirectoryRename`] records what was done.
    pub async fn rename_directory(&self, old_path: &str, new_path: &str) -> Result<()> {
        let operation = Operation::RenameDirectory;
        let mut session = self.begin(operation).await?;
        let mut progress = RenameProgress::default();
        let result = match move_directory(&mut *session, old_path, new_path, &mut progress).await {
            Ok(()) => Ok(()),
            Err(e) => Err(BridgeError::DirectoryRename {
                old: old_path.to_string(),
                new: new_path.to_string(),
                progress,
                source: Box::new(e),
            }),
        };
        self.finish(operation, session, result, |_| {
            format!("Directory renamed/moved from {old_path} to {new_path}")
        })
        .await
    }

    pub async fn get_file_size(&self, path: &str) -> Result<u64> {
        let operation = Operation::FileSize;
        let mut session = self.begin(operation).await?;
        let result = session.size(path).await;
        self.finish(operation, session, result, |size| {
            format!("File size of {path}: {size} bytes")
        })
        .await
    }

    /// True when `path` appears verbatim in the current directory's name
    /// listing.
    ///
    /// Only the current working directory is listed, so paths elsewhere on
    /// the server report false even when they exist.
    pub async fn file_exists(&self, path: &str) -> Result<bool> {
        let operation = Operation::FileExists;
        let mut session = self.begin(operation).await?;
        let result = session
            .name_list(None)
            .await
            .map(|files| files.iter().any(|file| file == path));
        self.finish(operation, session, result, |exists| {
            format!("File {path} exists: {exists}")
        })
        .await
    }

    /// The raw `MDTM` reply line; no parsing or timezone handling.
    pub async fn get_file_mtime(&self, path: &str) -> Result<String> {
        let operation = Operation::FileMtime;
        let mut session = self.begin(operation).await?;
        let result = session.modified_time(path).await;
        self.finish(operation, session, result, |mtime| {
            format!("File modification time of {path}: {mtime}")
        })
        .await
    }

    /// Sends `SITE CHMOD`. Servers without the extension reject it.
    pub async fn set_file_permissions(&self, path: &str, permissions: &str) -> Result<()> {
        let operation = Operation::SetPermissions;
        let mut session = self.begin(operation).await?;
        let result = session
            .site(&format!("CHMOD {permissions} {path}"))
            .await
            .map(|_| ());
        self.finish(operation, session, result, |_| {
            format!("File permissions set to {permissions} for {path}")
        })
        .await
    }

    /// Current-directory names matching a shell-glob `pattern`. Not
    /// recursive.
    pub async fn search_files(&self, pattern: &str) -> Result<Vec<String>> {
        let operation = Operation::SearchFiles;
        let filter = GlobFilter::new(pattern).map_err(|e| self.failed(operation, e))?;
        let mut session = self.begin(operation).await?;
        let result = session
            .name_list(None)
            .await
            .map(|files| filter.filter(files));
        self.finish(operation, session, result, |files| {
            format!("Files matching pattern {}: {files:?}", filter.pattern())
        })
        .await
    }

    /// True when a session can be opened and closed cleanly. Failures are
    /// reported as false, never raised.
    pub async fn check_ftp_health(&self) -> bool {
        let operation = Operation::HealthCheck;
        let session = match self.sessions.open_session().await {
            Ok(session) => session,
            Err(e) => {
                self.failed(operation, e);
                return false;
            }
        };

        match self.sessions.try_close(session).await {
            Ok(()) => {
                self.events.emit(BridgeEvent::Completed {
                    operation,
                    detail: "FTP server is reachable".to_string(),
                });
                true
            }
            Err(e) => {
                self.failed(operation, e);
                false
            }
        }
    }
}

async fn upload<S>(session: &mut S, local: &Path, remote: &str) -> Result<u64>
where
    S: RemoteSession + ?Sized,
{
    let mut file = LocalFile::open(local).await?;
    session.store(remote, &mut file).await
}

async fn download<S>(session: &mut S, remote: &str, local: &Path) -> Result<u64>
where
    S: RemoteSession + ?Sized,
{
    let mut file = LocalFile::create(local).await?;
    session.retrieve(remote, &mut file).await
}

fn basename(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}

fn join_remote(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

async fn move_directory<S>(
    session: &mut S,
    old_path: &str,
    new_path: &str,
    progress: &mut RenameProgress,
) -> Result<()>
where
    S: RemoteSession + ?Sized,
{
    let entries: Vec<String> = session
        .name_list(Some(old_path))
        .await?
        .into_iter()
        .filter(|entry| entry != old_path)
        .collect();
    progress.entries = Some(entries.clone());

    session.make_dir(new_path).await?;
    progress.directory_created = true;

    for entry in entries {
        let target = join_remote(new_path, basename(&entry));
        session.rename(&entry, &target).await?;
        progress.moved.push(entry);
    }

    session.remove_dir(old_path).await?;
    progress.old_removed = true;
    Ok(())
}
