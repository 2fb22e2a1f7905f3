//! In-memory remote server and recording event sink for unit tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::{Connector, Endpoint, RemoteSession};
use crate::config::FtpConfig;
use crate::error::{BridgeError, ConnectFailure, Result};
use crate::middleware::{BridgeEvent, EventSink};
use crate::protocol::{Command, Reply};
use crate::transfer::LocalFile;

pub fn configured() -> FtpConfig {
    FtpConfig {
        server: Some("ftp.test".into()),
        username: Some("tester".into()),
        password: Some("secret".into()),
        ..FtpConfig::default()
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BridgeEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: BridgeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Remote filesystem state. Paths are plain strings relative to the
/// session's working directory.
#[derive(Default)]
pub struct RemoteState {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeSet<String>,
    pub permissions: BTreeMap<String, String>,
    /// Commands (as displayed) that the server rejects with 550.
    pub rejected: HashSet<String>,
    pub site_supported: bool,
    pub connects: usize,
    pub closes: usize,
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

impl RemoteState {
    fn check(&self, command: &Command) -> Result<()> {
        if self.rejected.contains(&command.to_string()) {
            return Err(fail(command, 550, "Requested action not taken"));
        }
        Ok(())
    }

    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || self.dirs.contains(path)
    }

    fn children(&self, dir: &str) -> Vec<String> {
        self.files
            .keys()
            .chain(self.dirs.iter())
            .filter(|entry| parent(entry) == dir)
            .cloned()
            .collect()
    }
}

fn fail(command: &Command, code: u16, message: &str) -> BridgeError {
    BridgeError::rejected(command.to_string(), &Reply::new(code, message))
}

#[derive(Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<RemoteState>>,
    refuse: bool,
    fail_quit: bool,
}

impl MemoryConnector {
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn failing_quit(mut self) -> Self {
        self.fail_quit = true;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap()
    }

    pub fn with_file(self, path: &str, content: &[u8]) -> Self {
        self.state().files.insert(path.to_string(), content.to_vec());
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state().dirs.insert(path.to_string());
        self
    }

    pub fn rejecting(self, command: Command) -> Self {
        self.state().rejected.insert(command.to_string());
        self
    }

    pub fn connects(&self) -> usize {
        self.state().connects
    }

    pub fn closes(&self) -> usize {
        self.state().closes
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    type Session = MemorySession;

    async fn connect(&self, endpoint: &Endpoint) -> Result<MemorySession> {
        self.state().connects += 1;
        if self.refuse {
            return Err(BridgeError::Connection {
                endpoint: endpoint.address(),
                cause: ConnectFailure::Rejected(Reply::new(530, "Login incorrect")),
            });
        }
        Ok(MemorySession {
            state: Arc::clone(&self.state),
            fail_quit: self.fail_quit,
        })
    }
}

pub struct MemorySession {
    state: Arc<Mutex<RemoteState>>,
    fail_quit: bool,
}

impl MemorySession {
    fn state(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl RemoteSession for MemorySession {
    async fn store(&mut self, remote: &str, local: &mut LocalFile) -> Result<u64> {
        let command = Command::STOR(remote.to_string());
        self.state().check(&command)?;
        let content = local.read_to_end().await?;
        let len = content.len() as u64;
        let mut state = self.state();
        if !state.is_dir(parent(remote)) {
            return Err(fail(&command, 553, "Could not create file"));
        }
        state.files.insert(remote.to_string(), content);
        Ok(len)
    }

    async fn retrieve(&mut self, remote: &str, local: &mut LocalFile) -> Result<u64> {
        let command = Command::RETR(remote.to_string());
        let content = {
            let state = self.state();
            state.check(&command)?;
            state
                .files
                .get(remote)
                .cloned()
                .ok_or_else(|| fail(&command, 550, "Failed to open file"))?
        };
        local.write_all(&content).await?;
        Ok(content.len() as u64)
    }

    async fn name_list(&mut self, path: Option<&str>) -> Result<Vec<String>> {
        let command = Command::NLST(path.map(str::to_string));
        let state = self.state();
        state.check(&command)?;
        let dir = path.unwrap_or("");
        if !state.is_dir(dir) {
            return Err(fail(&command, 550, "No such directory"));
        }
        Ok(state.children(dir))
    }

    async fn delete(&mut self, path: &str) -> Result<()> {
        let command = Command::DELE(path.to_string());
        let mut state = self.state();
        state.check(&command)?;
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| fail(&command, 550, "Delete operation failed"))
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let command = Command::RNFR(from.to_string());
        let mut state = self.state();
        state.check(&command)?;
        state.check(&Command::RNTO(to.to_string()))?;
        if let Some(content) = state.files.remove(from) {
            state.files.insert(to.to_string(), content);
            Ok(())
        } else if state.dirs.remove(from) {
            state.dirs.insert(to.to_string());
            Ok(())
        } else {
            Err(fail(&command, 550, "RNFR command failed"))
        }
    }

    async fn make_dir(&mut self, path: &str) -> Result<()> {
        let command = Command::MKD(path.to_string());
        let mut state = self.state();
        state.check(&command)?;
        if state.is_dir(path) || state.files.contains_key(path) || !state.is_dir(parent(path)) {
            return Err(fail(&command, 550, "Create directory operation failed"));
        }
        state.dirs.insert(path.to_string());
        Ok(())
    }

    async fn remove_dir(&mut self, path: &str) -> Result<()> {
        let command = Command::RMD(path.to_string());
        let mut state = self.state();
        state.check(&command)?;
        if !state.dirs.contains(path) || !state.children(path).is_empty() {
            return Err(fail(&command, 550, "Remove directory operation failed"));
        }
        state.dirs.remove(path);
        Ok(())
    }

    async fn size(&mut self, path: &str) -> Result<u64> {
        let command = Command::SIZE(path.to_string());
        let state = self.state();
        state.check(&command)?;
        state
            .files
            .get(path)
            .map(|content| content.len() as u64)
            .ok_or_else(|| fail(&command, 550, "Could not get file size"))
    }

    async fn modified_time(&mut self, path: &str) -> Result<String> {
        let command = Command::MDTM(path.to_string());
        let state = self.state();
        state.check(&command)?;
        if state.files.contains_key(path) {
            Ok("213 20240101120000".to_string())
        } else {
            Err(fail(&command, 550, "Could not get file modification time"))
        }
    }

    async fn site(&mut self, params: &str) -> Result<Reply> {
        let command = Command::SITE(params.to_string());
        let mut state = self.state();
        state.check(&command)?;
        if !state.site_supported {
            return Err(fail(&command, 500, "Unknown SITE command"));
        }
        let mut parts = params.splitn(3, ' ');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(verb), Some(mode), Some(path)) if verb.eq_ignore_ascii_case("CHMOD") => {
                if !state.files.contains_key(path) && !state.dirs.contains(path) {
                    return Err(fail(&command, 550, "SITE CHMOD command failed"));
                }
                state.permissions.insert(path.to_string(), mode.to_string());
                Ok(Reply::new(200, "SITE CHMOD command ok"))
            }
            _ => Err(fail(&command, 501, "Syntax error")),
        }
    }

    async fn quit(&mut self) -> Result<()> {
        self.state().closes += 1;
        if self.fail_quit {
            return Err(BridgeError::Transport(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "connection reset",
            )));
        }
        Ok(())
    }
}
