//! FTP Response handling
//!
//! Reply codes and reading of single and multi-line server replies.

use std::fmt;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{BridgeError, Result};

/// Standard FTP response codes
pub const ENTERING_PASSIVE: u16 = 227;
pub const ENTERING_EXTENDED_PASSIVE: u16 = 229;

const MAX_REPLY_LINES: usize = 1024;
const MAX_LINE_BYTES: u64 = 8 * 1024;

/// A complete server reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    text: String,
}

impl Reply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// Reply text; lines of a multi-line reply are joined with `\n`.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1xx
    pub fn is_preliminary(&self) -> bool {
        self.code / 100 == 1
    }

    /// 2xx
    pub fn is_completion(&self) -> bool {
        self.code / 100 == 2
    }

    /// 3xx
    pub fn is_intermediate(&self) -> bool {
        self.code / 100 == 3
    }

    /// The reply as it appeared on the wire, without the line terminator.
    pub fn line(&self) -> String {
        format!("{} {}", self.code, self.text)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

fn parse_code(line: &str) -> Option<u16> {
    let digits = line.get(..3)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

async fn next_line<R>(reader: &mut R, line: &mut String) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    line.clear();
    let n = (&mut *reader).take(MAX_LINE_BYTES).read_line(line).await?;
    if n == 0 {
        return Err(BridgeError::Transport(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by server",
        )));
    }
    if n as u64 >= MAX_LINE_BYTES && !line.ends_with('\n') {
        return Err(BridgeError::Protocol(format!(
            "reply line exceeds {MAX_LINE_BYTES} bytes"
        )));
    }
    let trimmed = line.trim_end_matches(['\r', '\n']).len();
    line.truncate(trimmed);
    Ok(())
}

/// Reads one reply from the control connection.
///
/// A multi-line reply starts with `ddd-` and ends at the first line starting
/// with the same code followed by a space.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    next_line(reader, &mut line).await?;

    let code = parse_code(&line)
        .ok_or_else(|| BridgeError::Protocol(format!("malformed reply: {line:?}")))?;

    if line.as_bytes().get(3) != Some(&b'-') {
        let text = line.get(4..).unwrap_or("").to_string();
        return Ok(Reply::new(code, text));
    }

    let mut lines = vec![line[4..].to_string()];
    let terminator = format!("{code} ");
    loop {
        if lines.len() > MAX_REPLY_LINES {
            return Err(BridgeError::Protocol(format!(
                "reply {code} exceeds {MAX_REPLY_LINES} lines"
            )));
        }
        next_line(reader, &mut line).await?;
        if let Some(last) = line.strip_prefix(&terminator) {
            lines.push(last.to_string());
            break;
        }
        if line == code.to_string() {
            break;
        }
        lines.push(line.clone());
    }

    Ok(Reply::new(code, lines.join("\n")))
}
