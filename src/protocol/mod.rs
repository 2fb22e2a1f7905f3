//! FTP Protocol implementation
//!
//! Handles client-side command encoding, reply reading and reply parsing.

pub mod commands;
pub mod parser;
pub mod responses;

pub use commands::{Command, TransferType};
pub use parser::{parse_epsv, parse_name_list, parse_pasv, parse_size};
pub use responses::{Reply, read_reply};
