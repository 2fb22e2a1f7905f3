//! Reply parsing
//!
//! Extracts structured values from reply text: passive-mode ports, file sizes
//! and name listings.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::error::{BridgeError, Result};
use crate::protocol::Reply;

/// Parses a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply.
pub fn parse_pasv(reply: &Reply) -> Result<SocketAddrV4> {
    let text = reply.text();
    let malformed = || BridgeError::Protocol(format!("malformed PASV reply: {reply}"));

    // Servers disagree on the parentheses, so take the first run of six
    // comma-separated numbers.
    let start = text.find(|c: char| c.is_ascii_digit()).ok_or_else(malformed)?;
    let numbers: Vec<u8> = text[start..]
        .split(|c: char| !(c.is_ascii_digit() || c == ','))
        .next()
        .unwrap_or("")
        .split(',')
        .map(|part| part.parse::<u8>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| malformed())?;

    if numbers.len() != 6 {
        return Err(malformed());
    }

    let ip = Ipv4Addr::new(numbers[0], numbers[1], numbers[2], numbers[3]);
    let port = (u16::from(numbers[4]) << 8) | u16::from(numbers[5]);
    Ok(SocketAddrV4::new(ip, port))
}

/// Parses a `229 Entering Extended Passive Mode (|||port|)` reply.
pub fn parse_epsv(reply: &Reply) -> Result<u16> {
    let text = reply.text();
    let malformed = || BridgeError::Protocol(format!("malformed EPSV reply: {reply}"));

    let open = text.find('(').ok_or_else(malformed)?;
    let close = text[open..].find(')').ok_or_else(malformed)? + open;
    let inner = &text[open + 1..close];

    let delimiter = inner.chars().next().ok_or_else(malformed)?;
    let fields: Vec<&str> = inner.split(delimiter).collect();
    // "|||6446|" splits into ["", "", "", "6446", ""]
    if fields.len() != 5 {
        return Err(malformed());
    }
    fields[3].parse().map_err(|_| malformed())
}

/// Parses a `213 <size>` reply to `SIZE`.
pub fn parse_size(reply: &Reply) -> Result<u64> {
    reply
        .text()
        .trim()
        .parse()
        .map_err(|_| BridgeError::Protocol(format!("malformed SIZE reply: {reply}")))
}

/// Splits an `NLST` data transfer into entry names, dropping blank lines.
pub fn parse_name_list(data: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(data)
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
