//! Scripted FTP server on loopback for integration tests.
//!
//! Speaks enough of RFC 959 for the bridge's client: login, TYPE, PASV/EPSV,
//! the data commands and the single-reply file commands. State lives in
//! memory and is shared by every control connection.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use ftp_http_bridge::config::FtpConfig;
use ftp_http_bridge::middleware::{BridgeEvent, EventSink, LogSink};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "alice123";
pub const MTIME: &str = "20240101120000";

const DATA_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
pub struct MockState {
    pub files: BTreeMap<String, Vec<u8>>,
    pub dirs: BTreeSet<String>,
    pub permissions: BTreeMap<String, String>,
    /// Command lines (`"VERB arg"`) answered with 550.
    pub rejected: HashSet<String>,
    pub site_supported: bool,
    pub connections: usize,
    pub quits: usize,
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

impl MockState {
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

pub struct MockFtpServer {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
}

impl MockFtpServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(MockState::default()));

        let shared = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                shared.lock().unwrap().connections += 1;
                let state = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _ = serve(stream, state).await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    /// Configuration pointing at this server with valid credentials.
    pub fn config(&self) -> FtpConfig {
        FtpConfig {
            server: Some("127.0.0.1".into()),
            port: self.port(),
            username: Some(USERNAME.into()),
            password: Some(PASSWORD.into()),
            connect_timeout_secs: Some(5),
        }
    }

    pub fn with_file(self, path: &str, content: &[u8]) -> Self {
        self.state().files.insert(path.into(), content.to_vec());
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.state().dirs.insert(path.into());
        self
    }

    pub fn rejecting(self, line: &str) -> Self {
        self.state().rejected.insert(line.into());
        self
    }
}

/// Keeps every event and forwards it to [`LogSink`].
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<BridgeEvent>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: BridgeEvent) {
        LogSink.emit(event.clone());
        self.events.lock().unwrap().push(event);
    }
}

/// Process-wide logger keeping every formatted record.
struct CapturedLog {
    lines: Mutex<Vec<String>>,
}

impl log::Log for CapturedLog {
    fn enabled(&self, _: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        let line = format!("{} {}: {}", record.level(), record.target(), record.args());
        self.lines.lock().unwrap().push(line);
    }

    fn flush(&self) {}
}

static CAPTURED_LOG: CapturedLog = CapturedLog {
    lines: Mutex::new(Vec::new()),
};

/// Installs the capturing logger at trace level. Later calls are no-ops.
pub fn capture_logs() {
    let _ = log::set_logger(&CAPTURED_LOG);
    log::set_max_level(log::LevelFilter::Trace);
}

pub fn captured_logs() -> Vec<String> {
    CAPTURED_LOG.lines.lock().unwrap().clone()
}

/// Sends one raw HTTP request with an explicit content type.
pub async fn http_request_as(
    addr: SocketAddr,
    path: &str,
    content_type: &str,
    body: &str,
) -> (u16, serde_json::Value) {
    send_http(
        addr,
        format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ),
    )
    .await
}

enum Action {
    Reply(String),
    Upload(String),
    Download(Vec<u8>),
    Quit,
}

async fn reply(stream: &mut TcpStream, text: &str) -> std::io::Result<()> {
    stream.write_all(format!("{text}\r\n").as_bytes()).await?;
    stream.flush().await
}

async fn accept_data(passive: &mut Option<TcpListener>) -> std::io::Result<TcpStream> {
    let listener = passive.take().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::NotConnected, "no passive listener")
    })?;
    let (stream, _) = tokio::time::timeout(DATA_TIMEOUT, listener.accept())
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "data accept"))??;
    Ok(stream)
}

async fn serve(stream: TcpStream, state: Arc<Mutex<MockState>>) -> std::io::Result<()> {
    let mut control = BufReader::new(stream);
    reply(control.get_mut(), "220 Mock FTP ready").await?;

    let mut user = None;
    let mut logged_in = false;
    let mut rename_from: Option<String> = None;
    let mut passive: Option<TcpListener> = None;
    let mut line = String::new();

    loop {
        line.clear();
        if control.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let line = line.trim_end().to_string();
        let (verb, arg) = match line.split_once(' ') {
            Some((verb, arg)) => (verb.to_ascii_uppercase(), arg.to_string()),
            None => (line.to_ascii_uppercase(), String::new()),
        };

        match verb.as_str() {
            "USER" => {
                user = Some(arg);
                reply(control.get_mut(), "331 Password required").await?;
                continue;
            }
            "PASS" => {
                logged_in = user.as_deref() == Some(USERNAME) && arg == PASSWORD;
                let text = if logged_in {
                    "230 Login successful"
                } else {
                    "530 Login incorrect"
                };
                reply(control.get_mut(), text).await?;
                continue;
            }
            "QUIT" => {}
            _ if !logged_in => {
                reply(control.get_mut(), "530 Please login with USER and PASS").await?;
                continue;
            }
            "PASV" | "EPSV" => {
                let listener = TcpListener::bind("127.0.0.1:0").await?;
                let port = listener.local_addr()?.port();
                passive = Some(listener);
                let text = if verb == "PASV" {
                    format!(
                        "227 Entering Passive Mode (127,0,0,1,{},{})",
                        port >> 8,
                        port & 0xff
                    )
                } else {
                    format!("229 Entering Extended Passive Mode (|||{port}|)")
                };
                reply(control.get_mut(), &text).await?;
                continue;
            }
            _ => {}
        }

        let action = respond(&state, &verb, &arg, &line, &mut rename_from);
        match action {
            Action::Reply(text) => reply(control.get_mut(), &text).await?,
            Action::Quit => {
                reply(control.get_mut(), "221 Goodbye").await?;
                return Ok(());
            }
            Action::Upload(path) => {
                let mut data = accept_data(&mut passive).await?;
                reply(control.get_mut(), "150 Ok to send data").await?;
                let mut content = Vec::new();
                data.read_to_end(&mut content).await?;
                state.lock().unwrap().files.insert(path, content);
                reply(control.get_mut(), "226 Transfer complete").await?;
            }
            Action::Download(content) => {
                let mut data = accept_data(&mut passive).await?;
                reply(control.get_mut(), "150 Opening data connection").await?;
                data.write_all(&content).await?;
                data.shutdown().await?;
                drop(data);
                reply(control.get_mut(), "226 Transfer complete").await?;
            }
        }
    }
}

/// Decides the outcome of one command against the shared state.
fn respond(
    state: &Mutex<MockState>,
    verb: &str,
    arg: &str,
    line: &str,
    rename_from: &mut Option<String>,
) -> Action {
    let mut state = state.lock().unwrap();
    let text = |s: &str| Action::Reply(s.to_string());

    if verb == "QUIT" {
        state.quits += 1;
        return Action::Quit;
    }
    if state.rejected.contains(line) {
        return text("550 Requested action not taken");
    }

    match verb {
        "TYPE" => text("200 Type set"),
        "STOR" => {
            if state.is_dir(parent(arg)) {
                Action::Upload(arg.to_string())
            } else {
                text("553 Could not create file")
            }
        }
        "RETR" => match state.files.get(arg) {
            Some(content) => Action::Download(content.clone()),
            None => text("550 Failed to open file"),
        },
        "NLST" => {
            if !state.is_dir(arg) {
                return text("550 No such directory");
            }
            let listing: String = state
                .children(arg)
                .iter()
                .map(|name| format!("{name}\r\n"))
                .collect();
            Action::Download(listing.into_bytes())
        }
        "DELE" => match state.files.remove(arg) {
            Some(_) => text("250 Delete operation successful"),
            None => text("550 Delete operation failed"),
        },
        "RNFR" => {
            if state.files.contains_key(arg) || state.dirs.contains(arg) {
                *rename_from = Some(arg.to_string());
                text("350 Ready for RNTO")
            } else {
                text("550 RNFR command failed")
            }
        }
        "RNTO" => match rename_from.take() {
            Some(from) => {
                if let Some(content) = state.files.remove(&from) {
                    state.files.insert(arg.to_string(), content);
                } else if state.dirs.remove(&from) {
                    state.dirs.insert(arg.to_string());
                }
                text("250 Rename successful")
            }
            None => text("503 RNFR required first"),
        },
        "MKD" => {
            if state.is_dir(arg) || state.files.contains_key(arg) || !state.is_dir(parent(arg)) {
                text("550 Create directory operation failed")
            } else {
                state.dirs.insert(arg.to_string());
                Action::Reply(format!("257 \"{arg}\" created"))
            }
        }
        "RMD" => {
            if state.dirs.contains(arg) && state.children(arg).is_empty() {
                state.dirs.remove(arg);
                text("250 Remove directory operation successful")
            } else {
                text("550 Remove directory operation failed")
            }
        }
        "SIZE" => match state.files.get(arg) {
            Some(content) => Action::Reply(format!("213 {}", content.len())),
            None => text("550 Could not get file size"),
        },
        "MDTM" => {
            if state.files.contains_key(arg) {
                Action::Reply(format!("213 {MTIME}"))
            } else {
                text("550 Could not get file modification time")
            }
        }
        "SITE" => {
            if !state.site_supported {
                return text("500 Unknown SITE command");
            }
            let mut parts = arg.splitn(3, ' ');
            match (parts.next(), parts.next(), parts.next()) {
                (Some("CHMOD"), Some(mode), Some(path)) if state.files.contains_key(path) => {
                    state.permissions.insert(path.to_string(), mode.to_string());
                    text("200 SITE CHMOD command ok")
                }
                _ => text("550 SITE CHMOD command failed"),
            }
        }
        _ => text("502 Command not implemented"),
    }
}

/// Sends one raw HTTP request and returns the status and JSON body.
pub async fn http_request(addr: SocketAddr, method: &str, path: &str, form: &str) -> (u16, serde_json::Value) {
    send_http(
        addr,
        format!(
            "{method} {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{form}",
            form.len()
        ),
    )
    .await
}

async fn send_http(addr: SocketAddr, request: String) -> (u16, serde_json::Value) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let raw = String::from_utf8(raw).unwrap();

    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    let (_, body) = raw.split_once("\r\n\r\n").unwrap();
    (status, serde_json::from_str(body).unwrap())
}
