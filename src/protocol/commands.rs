//! Module `commands`
//!
//! Client-side FTP commands and their wire encoding.

use std::fmt;

/// Representation type requested with `TYPE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Ascii,
    Binary,
}

/// An FTP command sent by the bridge to the remote server.
///
/// Commands that require arguments store them as `String` variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    USER(String),
    PASS(String),
    TYPE(TransferType),
    PASV,
    EPSV,
    STOR(String),
    RETR(String),
    NLST(Option<String>), // Name list, current directory when empty
    DELE(String),
    RNFR(String), // Rename from
    RNTO(String), // Rename to
    MKD(String),
    RMD(String),
    SIZE(String),
    MDTM(String), // Modification time
    SITE(String), // Server-specific extension, e.g. CHMOD
    QUIT,
}

impl Command {
    /// The command verb.
    pub fn verb(&self) -> &'static str {
        match self {
            Command::USER(_) => "USER",
            Command::PASS(_) => "PASS",
            Command::TYPE(_) => "TYPE",
            Command::PASV => "PASV",
            Command::EPSV => "EPSV",
            Command::STOR(_) => "STOR",
            Command::RETR(_) => "RETR",
            Command::NLST(_) => "NLST",
            Command::DELE(_) => "DELE",
            Command::RNFR(_) => "RNFR",
            Command::RNTO(_) => "RNTO",
            Command::MKD(_) => "MKD",
            Command::RMD(_) => "RMD",
            Command::SIZE(_) => "SIZE",
            Command::MDTM(_) => "MDTM",
            Command::SITE(_) => "SITE",
            Command::QUIT => "QUIT",
        }
    }

    fn argument(&self) -> Option<&str> {
        match self {
            Command::USER(arg)
            | Command::PASS(arg)
            | Command::STOR(arg)
            | Command::RETR(arg)
            | Command::DELE(arg)
            | Command::RNFR(arg)
            | Command::RNTO(arg)
            | Command::MKD(arg)
            | Command::RMD(arg)
            | Command::SIZE(arg)
            | Command::MDTM(arg)
            | Command::SITE(arg) => Some(arg),
            Command::NLST(arg) => arg.as_deref(),
            Command::TYPE(TransferType::Ascii) => Some("A"),
            Command::TYPE(TransferType::Binary) => Some("I"),
            Command::PASV | Command::EPSV | Command::QUIT => None,
        }
    }

    /// Encodes the command as it is written to the control connection.
    pub fn to_wire(&self) -> String {
        match self.argument() {
            Some(arg) => format!("{} {}\r\n", self.verb(), arg),
            None => format!("{}\r\n", self.verb()),
        }
    }
}

/// Display is the loggable form: no line terminator, password masked.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self, self.argument()) {
            (Command::PASS(_), _) => write!(f, "PASS ****"),
            (_, Some(arg)) => write!(f, "{} {}", self.verb(), arg),
            (_, None) => write!(f, "{}", self.verb()),
        }
    }
}
